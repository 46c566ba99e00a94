pub mod parse;

mod cache;
mod compile;
mod config;
mod engine;
mod error;
mod evaluate;
mod source;
mod types;

pub use cache::{CacheStats, Clock, ManualClock, RulesCache, SystemClock};
pub use config::CacheSettings;
pub use engine::RulesEngine;
pub use error::RulesError;
pub use source::{InMemoryRuleStorage, RuleSource, RuleStorage, SourceError};
pub use types::{
    is_valid_uuid, AppliedConditions, CompileError, Criterion, CriterionKind, KindSet, LineOrder,
    MatchReport, NameMatcher, ParameterError, PolicyAssignments, PolicyDecision, PolicyFamily,
    PriorityOrder, Query, QueryError, QueryParameters, RankKey, Ranking, RuleIndex, RuleLine,
    RuleMatch, RuleSet, RuleSetBuilder, RulesVersion, CAMPUS_ID, INSTITUTION_ID, ITEM_TYPE_ID,
    LIBRARY_ID, LOAN_TYPE_ID, LOCATION_ID, PATRON_TYPE_ID, UUID_PATTERN,
};
