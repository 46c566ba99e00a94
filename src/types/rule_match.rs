use std::fmt;

use super::criterion::CriterionKind;
use super::policy::PolicyFamily;
use super::priority::PriorityOrder;
use super::rule::RuleLine;

/// Which of the item and patron criteria the matched line constrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct AppliedConditions {
    pub material_type_match: bool,
    pub loan_type_match: bool,
    pub patron_group_match: bool,
}

/// The policy a matched rule line assigns for one family.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[must_use]
pub struct RuleMatch {
    policy_id: String,
    family: PolicyFamily,
    source_line: usize,
    highest_kind: Option<CriterionKind>,
    applied_rule_conditions: AppliedConditions,
}

impl RuleMatch {
    pub fn new(policy_id: impl Into<String>, family: PolicyFamily, source_line: usize) -> Self {
        Self {
            policy_id: policy_id.into(),
            family,
            source_line,
            highest_kind: None,
            applied_rule_conditions: AppliedConditions::default(),
        }
    }

    /// `None` when `line` does not assign `family`.
    pub(crate) fn from_line(
        line: &RuleLine,
        family: PolicyFamily,
        order: &PriorityOrder,
    ) -> Option<Self> {
        let policy_id = line.policy(family)?;
        Some(Self {
            policy_id: policy_id.to_owned(),
            family,
            source_line: line.source_line,
            highest_kind: order.highest(line.kinds),
            applied_rule_conditions: AppliedConditions {
                material_type_match: line.kinds.contains(CriterionKind::MaterialType),
                loan_type_match: line.kinds.contains(CriterionKind::LoanType),
                patron_group_match: line.kinds.contains(CriterionKind::PatronGroup),
            },
        })
    }

    #[must_use]
    pub fn policy_id(&self) -> &str {
        &self.policy_id
    }

    #[must_use]
    pub fn family(&self) -> PolicyFamily {
        self.family
    }

    #[must_use]
    pub fn source_line(&self) -> usize {
        self.source_line
    }

    /// The matched line's criterion kind that ranks highest in the priority
    /// order; `None` for the fallback line.
    #[must_use]
    pub fn highest_kind(&self) -> Option<CriterionKind> {
        self.highest_kind
    }

    #[must_use]
    pub fn applied_conditions(&self) -> AppliedConditions {
        self.applied_rule_conditions
    }
}

impl fmt::Display for RuleMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (line {})", self.policy_id, self.source_line)
    }
}

/// One match per policy family, resolved in a single pass.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct PolicyDecision {
    pub loan: RuleMatch,
    pub request: RuleMatch,
    pub notice: RuleMatch,
    pub overdue_fine: RuleMatch,
    pub lost_item_fee: RuleMatch,
}

impl PolicyDecision {
    #[must_use]
    pub fn get(&self, family: PolicyFamily) -> &RuleMatch {
        match family {
            PolicyFamily::Loan => &self.loan,
            PolicyFamily::Request => &self.request,
            PolicyFamily::Notice => &self.notice,
            PolicyFamily::OverdueFine => &self.overdue_fine,
            PolicyFamily::LostItemFee => &self.lost_item_fee,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::criterion::Criterion;
    use crate::types::policy::PolicyAssignments;

    #[test]
    fn from_line_reports_highest_kind_and_conditions() {
        let line = RuleLine::new(
            vec![
                Criterion::new(CriterionKind::PatronGroup, "g1"),
                Criterion::new(CriterionKind::MaterialType, "m1"),
            ],
            PolicyAssignments::new().with(PolicyFamily::Loan, "lp4"),
            4,
        );
        let m = RuleMatch::from_line(&line, PolicyFamily::Loan, &PriorityOrder::default()).unwrap();
        assert_eq!(m.policy_id(), "lp4");
        assert_eq!(m.source_line(), 4);
        assert_eq!(m.highest_kind(), Some(CriterionKind::MaterialType));
        let applied = m.applied_conditions();
        assert!(applied.material_type_match);
        assert!(applied.patron_group_match);
        assert!(!applied.loan_type_match);
    }

    #[test]
    fn from_line_without_family_is_none() {
        let line = RuleLine::fallback(PolicyAssignments::new().with(PolicyFamily::Loan, "lp0"), 2);
        assert!(RuleMatch::from_line(&line, PolicyFamily::Request, &PriorityOrder::default()).is_none());
    }

    #[test]
    fn display() {
        assert_eq!(RuleMatch::new("lp3", PolicyFamily::Loan, 3).to_string(), "lp3 (line 3)");
    }
}
