use super::criterion::KindSet;
use super::policy::PolicyFamily;
use super::priority::Ranking;
use super::rule::RuleLine;

/// Per-family lists of rule lines, pre-sorted best first.
///
/// Every ranking key depends only on the line itself, so the order of
/// candidates is fixed at compile time. Matching walks the list for the
/// requested family and stops at the first line whose kinds the query
/// supplies and whose criteria all match.
#[derive(Debug, Clone)]
pub struct RuleIndex {
    by_family: [Vec<usize>; 5],
    kinds_used: KindSet,
}

impl RuleIndex {
    pub(crate) fn build(lines: &[RuleLine], ranking: &Ranking) -> Self {
        let mut ranked: Vec<usize> = (0..lines.len()).collect();
        ranked.sort_by(|&a, &b| ranking.compare(&lines[a], &lines[b]));

        let by_family = PolicyFamily::ALL.map(|family| {
            ranked
                .iter()
                .copied()
                .filter(|&i| lines[i].policies.assigns(family))
                .collect()
        });

        let kinds_used = lines
            .iter()
            .flat_map(|line| line.kinds.iter())
            .collect();

        Self {
            by_family,
            kinds_used,
        }
    }

    /// Indices of the lines assigning `family`, best first. The fallback,
    /// when it assigns the family, is last.
    #[must_use]
    pub fn ranked(&self, family: PolicyFamily) -> &[usize] {
        &self.by_family[family.index()]
    }

    /// Every criterion kind used by at least one line.
    #[must_use]
    pub fn kinds_used(&self) -> KindSet {
        self.kinds_used
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::criterion::{Criterion, CriterionKind};
    use crate::types::policy::PolicyAssignments;

    fn lines() -> Vec<RuleLine> {
        vec![
            RuleLine::fallback(PolicyAssignments::new().with(PolicyFamily::Loan, "lp0"), 2),
            RuleLine::new(
                vec![Criterion::new(CriterionKind::MaterialType, "m1")],
                PolicyAssignments::new()
                    .with(PolicyFamily::Loan, "lp1")
                    .with(PolicyFamily::Request, "rp1"),
                3,
            ),
            RuleLine::new(
                vec![
                    Criterion::new(CriterionKind::MaterialType, "m1"),
                    Criterion::new(CriterionKind::PatronGroup, "g1"),
                ],
                PolicyAssignments::new().with(PolicyFamily::Loan, "lp2"),
                4,
            ),
        ]
    }

    #[test]
    fn ranked_best_first_with_fallback_last() {
        let index = RuleIndex::build(&lines(), &Ranking::default());
        assert_eq!(index.ranked(PolicyFamily::Loan), &[2, 1, 0]);
    }

    #[test]
    fn families_only_list_assigning_lines() {
        let index = RuleIndex::build(&lines(), &Ranking::default());
        assert_eq!(index.ranked(PolicyFamily::Request), &[1]);
        assert!(index.ranked(PolicyFamily::Notice).is_empty());
    }

    #[test]
    fn kinds_used_collects_every_line() {
        let index = RuleIndex::build(&lines(), &Ranking::default());
        let used = index.kinds_used();
        assert!(used.contains(CriterionKind::MaterialType));
        assert!(used.contains(CriterionKind::PatronGroup));
        assert_eq!(used.len(), 2);
    }
}
