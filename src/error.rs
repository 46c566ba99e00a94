use thiserror::Error;

use crate::parse::ParseError;
use crate::source::SourceError;
use crate::{CompileError, PolicyFamily, QueryError};

/// Unified error type covering rule text, queries, rule storage, and I/O.
///
/// Returned by [`RuleSet::from_text()`](crate::RuleSet::from_text) and by
/// every [`RulesEngine`](crate::RulesEngine) operation.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("invalid query: {0}")]
    Query(#[from] QueryError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("no rule assigns a {family} policy for this query")]
    NoMatch { family: PolicyFamily },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RulesError {
    /// 1-based (line, column) in the rule text, for parse and compile errors.
    #[must_use]
    pub fn location(&self) -> Option<(usize, usize)> {
        match self {
            Self::Parse(e) => Some((e.line(), e.column())),
            Self::Compile(e) => Some(e.location()),
            _ => None,
        }
    }

    /// Whether the request itself was at fault rather than the stored rules
    /// or their storage.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Parse(_) | Self::Compile(_) | Self::Query(_))
    }
}
