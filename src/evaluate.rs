use std::time::Instant;

use crate::types::{MatchReport, PolicyFamily, Query, RuleLine, RuleMatch, RuleSet};

/// A line matches when the query carries every kind it constrains and every
/// criterion accepts the query's id.
fn line_matches(line: &RuleLine, query: &Query) -> bool {
    line.kinds.is_subset_of(query.kinds())
        && line
            .criteria
            .iter()
            .all(|criterion| criterion.matches(query.get(criterion.kind)))
}

fn candidates<'a>(
    rules: &'a RuleSet,
    query: &'a Query,
    family: PolicyFamily,
) -> impl Iterator<Item = &'a RuleLine> + 'a {
    rules
        .index
        .ranked(family)
        .iter()
        .map(|&i| &rules.lines[i])
        .filter(move |line| line_matches(line, query))
}

pub(crate) fn apply(rules: &RuleSet, query: &Query, family: PolicyFamily) -> Option<RuleMatch> {
    let order = rules.priority_order();
    candidates(rules, query, family)
        .find_map(|line| RuleMatch::from_line(line, family, &order))
}

pub(crate) fn apply_all(rules: &RuleSet, query: &Query, family: PolicyFamily) -> Vec<RuleMatch> {
    let order = rules.priority_order();
    candidates(rules, query, family)
        .filter_map(|line| RuleMatch::from_line(line, family, &order))
        .collect()
}

pub(crate) fn apply_detailed(rules: &RuleSet, query: &Query, family: PolicyFamily) -> MatchReport {
    let start = Instant::now();
    let matches = apply_all(rules, query, family);
    MatchReport::new(family, matches, start.elapsed())
}
