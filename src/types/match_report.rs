use std::fmt;
use std::time::Duration;

use super::policy::PolicyFamily;
use super::rule_match::RuleMatch;

/// Every candidate for one family, best first, returned by
/// [`RuleSet::apply_detailed()`](super::ruleset::RuleSet::apply_detailed).
///
/// The first entry is the match [`RuleSet::apply()`](super::ruleset::RuleSet::apply)
/// returns; the fallback, when it assigns the family, is last.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[must_use]
pub struct MatchReport {
    family: PolicyFamily,
    matches: Vec<RuleMatch>,
    #[cfg_attr(feature = "serde", serde(skip))]
    duration: Duration,
}

impl MatchReport {
    pub(crate) fn new(family: PolicyFamily, matches: Vec<RuleMatch>, duration: Duration) -> Self {
        Self {
            family,
            matches,
            duration,
        }
    }

    #[must_use]
    pub fn family(&self) -> PolicyFamily {
        self.family
    }

    #[must_use]
    pub fn matches(&self) -> &[RuleMatch] {
        &self.matches
    }

    #[must_use]
    pub fn best(&self) -> Option<&RuleMatch> {
        self.matches.first()
    }

    #[must_use]
    pub fn into_matches(self) -> Vec<RuleMatch> {
        self.matches
    }

    /// Wall-clock duration of the evaluation.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [", self.family)?;
        for (i, m) in self.matches.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{m}")?;
        }
        write!(f, "], duration: {:?}", self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_accessors() {
        let report = MatchReport::new(
            PolicyFamily::Loan,
            vec![
                RuleMatch::new("lp4", PolicyFamily::Loan, 4),
                RuleMatch::new("lp2", PolicyFamily::Loan, 2),
            ],
            Duration::from_nanos(500),
        );
        assert_eq!(report.family(), PolicyFamily::Loan);
        assert_eq!(report.matches().len(), 2);
        assert_eq!(report.best().map(RuleMatch::policy_id), Some("lp4"));
        assert_eq!(report.duration(), Duration::from_nanos(500));
    }

    #[test]
    fn report_display() {
        let report = MatchReport::new(
            PolicyFamily::Loan,
            vec![
                RuleMatch::new("lp4", PolicyFamily::Loan, 4),
                RuleMatch::new("lp2", PolicyFamily::Loan, 2),
            ],
            Duration::from_nanos(100),
        );
        assert!(report
            .to_string()
            .starts_with("loan: [lp4 (line 4), lp2 (line 2)]"));
    }

    #[test]
    fn empty_report() {
        let report = MatchReport::new(PolicyFamily::Notice, vec![], Duration::ZERO);
        assert!(report.best().is_none());
        assert!(report.to_string().starts_with("notice: []"));
    }
}
