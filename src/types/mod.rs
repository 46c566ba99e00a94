mod criterion;
mod error;
mod match_report;
mod policy;
mod priority;
mod query;
mod rule;
mod rule_index;
mod rule_match;
mod ruleset;
mod version;

pub use criterion::{Criterion, CriterionKind, KindSet, NameMatcher};
pub use error::{CompileError, ParameterError, QueryError};
pub use match_report::MatchReport;
pub use policy::{PolicyAssignments, PolicyFamily};
pub use priority::{LineOrder, PriorityOrder, RankKey, Ranking};
pub use query::{
    is_valid_uuid, Query, QueryParameters, CAMPUS_ID, INSTITUTION_ID, ITEM_TYPE_ID, LIBRARY_ID,
    LOAN_TYPE_ID, LOCATION_ID, PATRON_TYPE_ID, UUID_PATTERN,
};
pub use rule::RuleLine;
pub use rule_index::RuleIndex;
pub use rule_match::{AppliedConditions, PolicyDecision, RuleMatch};
pub use ruleset::{RuleSet, RuleSetBuilder};
pub use version::RulesVersion;
