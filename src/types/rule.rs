use std::fmt;

use super::criterion::{Criterion, CriterionKind, KindSet};
use super::policy::{PolicyAssignments, PolicyFamily};

/// A flattened rule line: the conjunction of its own criteria and every
/// criterion inherited from enclosing lines, the policies it assigns, and
/// where it came from.
///
/// Produced by compiling rule text or by [`RuleSetBuilder`](super::RuleSetBuilder).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleLine {
    pub(crate) criteria: Vec<Criterion>,
    pub(crate) kinds: KindSet,
    pub(crate) policies: PolicyAssignments,
    pub(crate) source_line: usize,
    pub(crate) is_fallback: bool,
}

impl RuleLine {
    #[must_use]
    pub fn new(criteria: Vec<Criterion>, policies: PolicyAssignments, source_line: usize) -> Self {
        let kinds = criteria.iter().map(|c| c.kind).collect();
        Self {
            criteria,
            kinds,
            policies,
            source_line,
            is_fallback: false,
        }
    }

    /// The criteria-free line matched when nothing else applies.
    #[must_use]
    pub fn fallback(policies: PolicyAssignments, source_line: usize) -> Self {
        Self {
            criteria: Vec::new(),
            kinds: KindSet::empty(),
            policies,
            source_line,
            is_fallback: true,
        }
    }

    #[must_use]
    pub fn criteria(&self) -> &[Criterion] {
        &self.criteria
    }

    #[must_use]
    pub fn kinds(&self) -> KindSet {
        self.kinds
    }

    #[must_use]
    pub fn policies(&self) -> &PolicyAssignments {
        &self.policies
    }

    #[must_use]
    pub fn policy(&self, family: PolicyFamily) -> Option<&str> {
        self.policies.get(family)
    }

    /// 1-based line number in the rule text.
    #[must_use]
    pub fn source_line(&self) -> usize {
        self.source_line
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }

    /// Number of criteria; every criterion of a candidate line has matched.
    #[must_use]
    pub fn specificity(&self) -> usize {
        self.criteria.len()
    }

    /// The criterion a query must satisfy for `kind`, if the line has one.
    #[must_use]
    pub fn criterion(&self, kind: CriterionKind) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.kind == kind)
    }
}

impl fmt::Display for RuleLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_fallback {
            return write!(f, "fallback-policy: {}", self.policies);
        }
        for (i, criterion) in self.criteria.iter().enumerate() {
            if i > 0 {
                f.write_str(" + ")?;
            }
            write!(f, "{criterion}")?;
        }
        write!(f, ": {}", self.policies)
    }
}
