use std::fmt;

use thiserror::Error;

use super::query::UUID_PATTERN;

/// Structural problems found after the rule text parsed.
///
/// Every variant carries the 1-based line and column it refers to.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    #[error("7 letters expected, found only {found} (line {line}, column {column})")]
    TooFewPriorityLetters {
        found: usize,
        line: usize,
        column: usize,
    },

    #[error("Only 7 letters expected, found {found} (line {line}, column {column})")]
    TooManyPriorityLetters {
        found: usize,
        line: usize,
        column: usize,
    },

    #[error("Duplicate letter {letter} (line {line}, column {column})")]
    DuplicatePriorityLetter {
        letter: char,
        line: usize,
        column: usize,
    },

    #[error("Duplicate priority type (line {line}, column {column})")]
    DuplicatePriorityType { line: usize, column: usize },

    #[error("Line priority must be the last priority type (line {line}, column {column})")]
    MisplacedLinePriority { line: usize, column: usize },

    #[error("Duplicate criterium type {kind} (line {line}, column {column})")]
    DuplicateCriterion {
        kind: char,
        line: usize,
        column: usize,
    },

    #[error("Cannot mix negated and plain names (line {line}, column {column})")]
    MixedNegation { line: usize, column: usize },

    #[error("Policy missing (line {line}, column {column})")]
    PolicyMissing { line: usize, column: usize },

    #[error("Criteria missing (line {line}, column {column})")]
    MissingCriteria { line: usize, column: usize },

    #[error("Policy missing after ':' (line {line}, column {column})")]
    PolicyMissingAfterColon { line: usize, column: usize },

    #[error("Only one policy of type {family} allowed (line {line}, column {column})")]
    DuplicatePolicy {
        family: char,
        line: usize,
        column: usize,
    },

    #[error("fallback-policy line missing (line {line}, column {column})")]
    MissingFallback { line: usize, column: usize },

    #[error("Duplicate fallback-policy line (line {line}, column {column})")]
    DuplicateFallback { line: usize, column: usize },

    #[error("fallback-policy must not be indented (line {line}, column {column})")]
    IndentedFallback { line: usize, column: usize },

    #[error("Id {id:?} cannot be written as rule text (line {line}, column {column})")]
    UnwritableId {
        id: String,
        line: usize,
        column: usize,
    },
}

impl CompileError {
    /// The 1-based (line, column) the error refers to.
    #[must_use]
    pub fn location(&self) -> (usize, usize) {
        match *self {
            Self::TooFewPriorityLetters { line, column, .. }
            | Self::TooManyPriorityLetters { line, column, .. }
            | Self::DuplicatePriorityLetter { line, column, .. }
            | Self::DuplicatePriorityType { line, column }
            | Self::MisplacedLinePriority { line, column }
            | Self::DuplicateCriterion { line, column, .. }
            | Self::MixedNegation { line, column }
            | Self::PolicyMissing { line, column }
            | Self::MissingCriteria { line, column }
            | Self::PolicyMissingAfterColon { line, column }
            | Self::DuplicatePolicy { line, column, .. }
            | Self::MissingFallback { line, column }
            | Self::DuplicateFallback { line, column }
            | Self::IndentedFallback { line, column }
            | Self::UnwritableId { line, column, .. } => (line, column),
        }
    }
}

/// One problem with one query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParameterError {
    #[error("required query parameter missing: {parameter}")]
    Missing { parameter: &'static str },

    #[error(
        "invalid uuid format of {parameter}, expecting {pattern} but it is {value}",
        pattern = UUID_PATTERN
    )]
    InvalidUuid {
        parameter: &'static str,
        value: String,
    },
}

impl ParameterError {
    #[must_use]
    pub fn parameter(&self) -> &'static str {
        match self {
            Self::Missing { parameter } | Self::InvalidUuid { parameter, .. } => *parameter,
        }
    }
}

/// Every problem found while validating query parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryError {
    problems: Vec<ParameterError>,
}

impl QueryError {
    pub(crate) fn new(problems: Vec<ParameterError>) -> Self {
        Self { problems }
    }

    #[must_use]
    pub fn problems(&self) -> &[ParameterError] {
        &self.problems
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, problem) in self.problems.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{problem}")?;
        }
        Ok(())
    }
}

impl std::error::Error for QueryError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_few_letters_message() {
        let err = CompileError::TooFewPriorityLetters {
            found: 6,
            line: 1,
            column: 11,
        };
        assert_eq!(
            err.to_string(),
            "7 letters expected, found only 6 (line 1, column 11)"
        );
        assert_eq!(err.location(), (1, 11));
    }

    #[test]
    fn duplicate_letter_message() {
        let err = CompileError::DuplicatePriorityLetter {
            letter: 's',
            line: 1,
            column: 23,
        };
        assert_eq!(err.to_string(), "Duplicate letter s (line 1, column 23)");
    }

    #[test]
    fn duplicate_policy_message() {
        let err = CompileError::DuplicatePolicy {
            family: 'l',
            line: 3,
            column: 15,
        };
        assert_eq!(
            err.to_string(),
            "Only one policy of type l allowed (line 3, column 15)"
        );
    }

    #[test]
    fn missing_parameter_message() {
        let err = ParameterError::Missing {
            parameter: "item_type_id",
        };
        assert_eq!(
            err.to_string(),
            "required query parameter missing: item_type_id"
        );
        assert_eq!(err.parameter(), "item_type_id");
    }

    #[test]
    fn invalid_uuid_message() {
        let err = ParameterError::InvalidUuid {
            parameter: "location_id",
            value: "0".into(),
        };
        let message = err.to_string();
        assert!(message.starts_with("invalid uuid format of location_id, expecting ^[a-fA-F0-9]{8}"));
        assert!(message.ends_with("but it is 0"));
    }

    #[test]
    fn query_error_joins_problems() {
        let err = QueryError::new(vec![
            ParameterError::Missing {
                parameter: "item_type_id",
            },
            ParameterError::Missing {
                parameter: "loan_type_id",
            },
        ]);
        assert_eq!(
            err.to_string(),
            "required query parameter missing: item_type_id; required query parameter missing: loan_type_id"
        );
    }
}
