use std::fmt;

use super::criterion::{Criterion, KindSet, NameMatcher};
use super::error::CompileError;
use super::match_report::MatchReport;
use super::policy::{PolicyAssignments, PolicyFamily};
use super::priority::{PriorityOrder, Ranking};
use super::query::Query;
use super::rule::RuleLine;
use super::rule_index::RuleIndex;
use super::rule_match::{PolicyDecision, RuleMatch};
use super::version::RulesVersion;

/// Builder for constructing a [`RuleSet`] without going through rule text.
///
/// Lines are numbered in call order starting at 2, as if the priority line
/// were line 1 and every call added one line below it.
///
/// # Example
///
/// ```
/// use circulation_rules::{Criterion, CriterionKind, PolicyAssignments, PolicyFamily, RuleSetBuilder};
///
/// let rules = RuleSetBuilder::new()
///     .fallback(PolicyAssignments::new().with(PolicyFamily::Loan, "lp-default"))
///     .line(
///         vec![Criterion::new(CriterionKind::MaterialType, "book")],
///         PolicyAssignments::new().with(PolicyFamily::Loan, "lp-book"),
///     )
///     .build()
///     .unwrap();
/// assert_eq!(rules.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct RuleSetBuilder {
    ranking: Ranking,
    fallback: Option<(PolicyAssignments, usize)>,
    lines: Vec<RuleLine>,
    next_line: usize,
}

impl RuleSetBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_line: 2,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn ranking(mut self, ranking: Ranking) -> Self {
        self.ranking = ranking;
        self
    }

    /// Set the fallback policies. A second call replaces the first.
    #[must_use]
    pub fn fallback(mut self, policies: PolicyAssignments) -> Self {
        let line = self.take_line();
        self.fallback = Some((policies, line));
        self
    }

    /// Add a rule line. Criteria are the full conjunction; there is no
    /// nesting in the builder.
    #[must_use]
    pub fn line(mut self, criteria: Vec<Criterion>, policies: PolicyAssignments) -> Self {
        let line = self.take_line();
        self.lines.push(RuleLine::new(criteria, policies, line));
        self
    }

    fn take_line(&mut self) -> usize {
        let line = self.next_line.max(2);
        self.next_line = line + 1;
        line
    }

    /// The rule text this builder describes. For a builder that
    /// [`build()`](Self::build) accepts, compiling it yields a set that
    /// matches exactly like the built one.
    #[must_use]
    pub fn render(&self) -> String {
        let mut entries: Vec<(usize, String)> = self
            .lines
            .iter()
            .map(|line| (line.source_line, line.to_string()))
            .collect();
        if let Some((policies, line)) = &self.fallback {
            entries.push((*line, RuleLine::fallback(policies.clone(), *line).to_string()));
        }
        entries.sort_by_key(|(line, _)| *line);

        let mut text = format!("priority: {}\n", self.ranking);
        for (_, entry) in entries {
            text.push_str(&entry);
            text.push('\n');
        }
        text
    }

    /// Validate the lines and build the set.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] when no fallback was given, a line or the
    /// fallback assigns no policy, a line has no criteria, a line repeats
    /// a criterion kind, or an id would read back differently from rule text.
    pub fn build(self) -> Result<RuleSet, CompileError> {
        let version = RulesVersion::of(&self.render());
        let Some((policies, fallback_line)) = self.fallback else {
            return Err(CompileError::MissingFallback {
                line: self.next_line.max(2),
                column: 1,
            });
        };
        if policies.is_empty() {
            return Err(CompileError::PolicyMissing {
                line: fallback_line,
                column: 1,
            });
        }
        check_policy_ids(&policies, fallback_line)?;

        for line in &self.lines {
            let location = (line.source_line, 1);
            if line.criteria.is_empty() {
                return Err(CompileError::MissingCriteria {
                    line: location.0,
                    column: location.1,
                });
            }
            if line.kinds.len() != line.criteria.len() {
                let mut seen = KindSet::empty();
                for criterion in &line.criteria {
                    if seen.contains(criterion.kind) {
                        return Err(CompileError::DuplicateCriterion {
                            kind: criterion.kind.letter(),
                            line: location.0,
                            column: location.1,
                        });
                    }
                    seen.insert(criterion.kind);
                }
            }
            if line.policies.is_empty() {
                return Err(CompileError::PolicyMissing {
                    line: location.0,
                    column: location.1,
                });
            }
            for criterion in &line.criteria {
                check_criterion_ids(criterion, location.0)?;
            }
            check_policy_ids(&line.policies, location.0)?;
        }

        let mut lines = self.lines;
        lines.push(RuleLine::fallback(policies, fallback_line));
        lines.sort_by_key(|line| line.source_line);
        Ok(RuleSet::new(self.ranking, lines, version))
    }
}

/// An id token the grammar reads back unchanged: no spaces or colons, and no
/// leading character that starts another token.
fn is_writable_id(id: &str, leading: &[char]) -> bool {
    !id.is_empty()
        && !id.starts_with(leading)
        && !id.contains(|c: char| c.is_whitespace() || c == ':')
}

fn unwritable(id: &str, line: usize) -> CompileError {
    CompileError::UnwritableId {
        id: id.to_owned(),
        line,
        column: 1,
    }
}

fn check_criterion_ids(criterion: &Criterion, line: usize) -> Result<(), CompileError> {
    let NameMatcher::Ids { ids, negated } = &criterion.names else {
        return Ok(());
    };
    // A lone plain `all` reads back as the wildcard.
    match ids.as_slice() {
        [] => return Err(unwritable("", line)),
        [id] if id == "all" && !negated => return Err(unwritable(id, line)),
        _ => {}
    }
    match ids.iter().find(|id| !is_writable_id(id, &['+', '#', '!'])) {
        Some(id) => Err(unwritable(id, line)),
        None => Ok(()),
    }
}

fn check_policy_ids(policies: &PolicyAssignments, line: usize) -> Result<(), CompileError> {
    match policies.iter().find(|(_, id)| !is_writable_id(id, &['+', '#'])) {
        Some((_, id)) => Err(unwritable(id, line)),
        None => Ok(()),
    }
}

/// A compiled, immutable rule set. Thread-safe and designed to live behind `Arc`.
///
/// Lines are kept in source order; the per-family ranked order lives in the
/// [`RuleIndex`].
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub(crate) ranking: Ranking,
    pub(crate) lines: Vec<RuleLine>,
    pub(crate) index: RuleIndex,
    pub(crate) fallback: usize,
    pub(crate) version: RulesVersion,
}

impl RuleSet {
    /// `lines` must hold exactly one fallback line.
    pub(crate) fn new(ranking: Ranking, lines: Vec<RuleLine>, version: RulesVersion) -> Self {
        let index = RuleIndex::build(&lines, &ranking);
        let fallback = lines
            .iter()
            .position(RuleLine::is_fallback)
            .unwrap_or(lines.len().saturating_sub(1));
        Self {
            ranking,
            lines,
            index,
            fallback,
            version,
        }
    }

    /// Parse rule text and compile it into a `RuleSet`.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::Parse`](crate::RulesError::Parse) or
    /// [`RulesError::Compile`](crate::RulesError::Compile) with the line and
    /// column of the first problem.
    pub fn from_text(text: &str) -> Result<Self, crate::RulesError> {
        let parsed = crate::parse::parse(text)?;
        let rules = crate::compile::compile(&parsed, RulesVersion::of(text))?;
        Ok(rules)
    }

    /// Read a rule file and compile it.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError`](crate::RulesError) on I/O, parse, or compile failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, crate::RulesError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_text(&text)
    }

    /// The best-ranked line assigning `family` that matches `query`.
    ///
    /// Only `None` when the fallback does not assign `family` either.
    pub fn apply(&self, query: &Query, family: PolicyFamily) -> Option<RuleMatch> {
        crate::evaluate::apply(self, query, family)
    }

    /// Every line assigning `family` that matches `query`, best first.
    pub fn apply_all(&self, query: &Query, family: PolicyFamily) -> Vec<RuleMatch> {
        crate::evaluate::apply_all(self, query, family)
    }

    /// [`apply_all()`](Self::apply_all) with timing.
    pub fn apply_detailed(&self, query: &Query, family: PolicyFamily) -> MatchReport {
        crate::evaluate::apply_detailed(self, query, family)
    }

    /// Resolve all five families at once.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError::NoMatch`](crate::RulesError::NoMatch) for the
    /// first family no matching line assigns.
    pub fn decide(&self, query: &Query) -> Result<PolicyDecision, crate::RulesError> {
        let resolve = |family| {
            self.apply(query, family)
                .ok_or(crate::RulesError::NoMatch { family })
        };
        Ok(PolicyDecision {
            loan: resolve(PolicyFamily::Loan)?,
            request: resolve(PolicyFamily::Request)?,
            notice: resolve(PolicyFamily::Notice)?,
            overdue_fine: resolve(PolicyFamily::OverdueFine)?,
            lost_item_fee: resolve(PolicyFamily::LostItemFee)?,
        })
    }

    #[must_use]
    pub fn ranking(&self) -> &Ranking {
        &self.ranking
    }

    #[must_use]
    pub fn priority_order(&self) -> PriorityOrder {
        self.ranking.priority_order()
    }

    /// Flattened lines in source order, fallback included.
    #[must_use]
    pub fn lines(&self) -> &[RuleLine] {
        &self.lines
    }

    #[must_use]
    pub fn fallback(&self) -> &RuleLine {
        &self.lines[self.fallback]
    }

    /// Digest of the rule text this set was compiled from.
    #[must_use]
    pub fn version(&self) -> RulesVersion {
        self.version
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Criterion kinds at least one line constrains.
    #[must_use]
    pub fn kinds_used(&self) -> KindSet {
        self.index.kinds_used()
    }
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RuleSet({} lines, fallback at line {}, ranking: {})",
            self.lines.len(),
            self.fallback().source_line,
            self.ranking,
        )
    }
}
