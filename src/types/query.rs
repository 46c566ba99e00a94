use uuid::{Uuid, Variant};

use super::criterion::{CriterionKind, KindSet};
use super::error::{ParameterError, QueryError};

pub const ITEM_TYPE_ID: &str = "item_type_id";
pub const LOAN_TYPE_ID: &str = "loan_type_id";
pub const PATRON_TYPE_ID: &str = "patron_type_id";
pub const LOCATION_ID: &str = "location_id";
pub const LIBRARY_ID: &str = "library_id";
pub const CAMPUS_ID: &str = "campus_id";
pub const INSTITUTION_ID: &str = "institution_id";

/// Pattern accepted for every id parameter.
pub const UUID_PATTERN: &str =
    "^[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[1-5][a-fA-F0-9]{3}-[89abAB][a-fA-F0-9]{3}-[a-fA-F0-9]{12}$";

/// The ids a rule set is matched against.
///
/// The location ancestors are optional: the caller resolves whichever of
/// library, campus and institution it knows, and criteria on a kind the query
/// does not carry never match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    material_type: String,
    loan_type: String,
    patron_group: String,
    location: String,
    library: Option<String>,
    campus: Option<String>,
    institution: Option<String>,
}

impl Query {
    pub fn new(
        material_type: impl Into<String>,
        loan_type: impl Into<String>,
        patron_group: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            material_type: material_type.into(),
            loan_type: loan_type.into(),
            patron_group: patron_group.into(),
            location: location.into(),
            library: None,
            campus: None,
            institution: None,
        }
    }

    #[must_use]
    pub fn with_library(mut self, id: impl Into<String>) -> Self {
        self.library = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_campus(mut self, id: impl Into<String>) -> Self {
        self.campus = Some(id.into());
        self
    }

    #[must_use]
    pub fn with_institution(mut self, id: impl Into<String>) -> Self {
        self.institution = Some(id.into());
        self
    }

    /// The id this query supplies for `kind`.
    #[must_use]
    pub fn get(&self, kind: CriterionKind) -> Option<&str> {
        match kind {
            CriterionKind::MaterialType => Some(&self.material_type),
            CriterionKind::LoanType => Some(&self.loan_type),
            CriterionKind::PatronGroup => Some(&self.patron_group),
            CriterionKind::ShelvingLocation => Some(&self.location),
            CriterionKind::Library => self.library.as_deref(),
            CriterionKind::Campus => self.campus.as_deref(),
            CriterionKind::Institution => self.institution.as_deref(),
        }
    }

    /// Kinds this query supplies an id for.
    #[must_use]
    pub fn kinds(&self) -> KindSet {
        CriterionKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).is_some())
            .collect()
    }
}

/// Unvalidated query parameters, named the way callers send them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParameters {
    pub item_type_id: Option<String>,
    pub loan_type_id: Option<String>,
    pub patron_type_id: Option<String>,
    pub location_id: Option<String>,
    pub library_id: Option<String>,
    pub campus_id: Option<String>,
    pub institution_id: Option<String>,
}

impl QueryParameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters with the four required ids set.
    pub fn required(
        item_type_id: impl Into<String>,
        loan_type_id: impl Into<String>,
        patron_type_id: impl Into<String>,
        location_id: impl Into<String>,
    ) -> Self {
        Self {
            item_type_id: Some(item_type_id.into()),
            loan_type_id: Some(loan_type_id.into()),
            patron_type_id: Some(patron_type_id.into()),
            location_id: Some(location_id.into()),
            ..Self::default()
        }
    }

    /// Collects parameters from `name=value` pairs; unknown names are ignored
    /// and a repeated name keeps its last value.
    pub fn from_pairs<'a, I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut params = Self::default();
        for (name, value) in pairs {
            if let Some(slot) = params.slot_mut(name) {
                *slot = Some(value.to_owned());
            }
        }
        params
    }

    #[must_use]
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        if let Some(slot) = self.slot_mut(name) {
            *slot = Some(value.into());
        }
        self
    }

    fn slot_mut(&mut self, name: &str) -> Option<&mut Option<String>> {
        match name {
            ITEM_TYPE_ID => Some(&mut self.item_type_id),
            LOAN_TYPE_ID => Some(&mut self.loan_type_id),
            PATRON_TYPE_ID => Some(&mut self.patron_type_id),
            LOCATION_ID => Some(&mut self.location_id),
            LIBRARY_ID => Some(&mut self.library_id),
            CAMPUS_ID => Some(&mut self.campus_id),
            INSTITUTION_ID => Some(&mut self.institution_id),
            _ => None,
        }
    }

    /// Checks presence of the four required ids and the syntax of every
    /// supplied id, reporting every problem found.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError`] listing each missing or malformed parameter.
    pub fn validate(&self) -> Result<Query, QueryError> {
        let mut problems = Vec::new();

        let item_type = required(ITEM_TYPE_ID, self.item_type_id.as_deref(), &mut problems);
        let loan_type = required(LOAN_TYPE_ID, self.loan_type_id.as_deref(), &mut problems);
        let patron_type = required(PATRON_TYPE_ID, self.patron_type_id.as_deref(), &mut problems);
        let location = required(LOCATION_ID, self.location_id.as_deref(), &mut problems);
        let library = optional(LIBRARY_ID, self.library_id.as_deref(), &mut problems);
        let campus = optional(CAMPUS_ID, self.campus_id.as_deref(), &mut problems);
        let institution = optional(INSTITUTION_ID, self.institution_id.as_deref(), &mut problems);

        match (item_type, loan_type, patron_type, location) {
            (Some(m), Some(t), Some(g), Some(s)) if problems.is_empty() => Ok(Query {
                material_type: m.to_owned(),
                loan_type: t.to_owned(),
                patron_group: g.to_owned(),
                location: s.to_owned(),
                library: library.map(str::to_owned),
                campus: campus.map(str::to_owned),
                institution: institution.map(str::to_owned),
            }),
            _ => Err(QueryError::new(problems)),
        }
    }
}

fn required<'a>(
    name: &'static str,
    value: Option<&'a str>,
    problems: &mut Vec<ParameterError>,
) -> Option<&'a str> {
    match value {
        None => {
            problems.push(ParameterError::Missing { parameter: name });
            None
        }
        Some(value) => optional(name, Some(value), problems),
    }
}

fn optional<'a>(
    name: &'static str,
    value: Option<&'a str>,
    problems: &mut Vec<ParameterError>,
) -> Option<&'a str> {
    let value = value?;
    if is_valid_uuid(value) {
        Some(value)
    } else {
        problems.push(ParameterError::InvalidUuid {
            parameter: name,
            value: value.to_owned(),
        });
        None
    }
}

/// Hyphenated RFC 4122 UUID with a version between 1 and 5.
#[must_use]
pub fn is_valid_uuid(value: &str) -> bool {
    if value.len() != 36 {
        return false;
    }
    match Uuid::parse_str(value) {
        Ok(uuid) => {
            (1..=5).contains(&uuid.get_version_num()) && uuid.get_variant() == Variant::RFC4122
        }
        Err(_) => false,
    }
}
