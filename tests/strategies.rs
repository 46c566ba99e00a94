use circulation_rules::{
    Criterion, CriterionKind, LineOrder, PolicyAssignments, PolicyFamily, PriorityOrder, Query,
    RankKey, Ranking, RuleSet, RuleSetBuilder,
};
use proptest::prelude::*;

// --- Fixed id vocabulary ---
// Every criterion and every query draws its ids from NAMES, so generated
// lines match generated queries often enough to exercise the ranking.

pub const NAMES: &[&str] = &["book", "dvd", "map", "score"];

/// Source line of the fallback in every generated rule set.
pub const FALLBACK_LINE: usize = 2;

fn kinds() -> Vec<CriterionKind> {
    CriterionKind::ALL.to_vec()
}

/// A criterion on `kind`: `all`, a plain name list, or a negated one.
fn arb_criterion(kind: CriterionKind) -> impl Strategy<Value = Criterion> {
    prop_oneof![
        1 => Just(Criterion::all(kind)),
        3 => prop::sample::subsequence(NAMES.to_vec(), 1..=2)
            .prop_map(move |names| Criterion::any_of(kind, names)),
        1 => prop::sample::subsequence(NAMES.to_vec(), 1..=2)
            .prop_map(move |names| Criterion::none_of(kind, names)),
    ]
}

/// A priority order with the seven kinds shuffled.
pub fn arb_priority_order() -> impl Strategy<Value = PriorityOrder> {
    Just(kinds()).prop_shuffle().prop_map(|shuffled| {
        let kinds: [CriterionKind; 7] = shuffled.try_into().unwrap();
        PriorityOrder::new(kinds).unwrap()
    })
}

pub fn arb_ranking() -> impl Strategy<Value = Ranking> {
    prop_oneof![
        arb_priority_order().prop_map(Ranking::from_order),
        arb_priority_order()
            .prop_map(|order| Ranking::from_keys(vec![RankKey::Criterium(order), RankKey::NumberOfCriteria])),
        Just(Ranking::from_keys(vec![RankKey::NumberOfCriteria, RankKey::Line(LineOrder::FirstLine)])),
        Just(Ranking::from_keys(vec![RankKey::Line(LineOrder::FirstLine)])),
        Just(Ranking::from_keys(vec![RankKey::Line(LineOrder::LastLine)])),
    ]
}

/// A generated rule line: criteria on distinct kinds plus the families it assigns.
#[derive(Debug, Clone)]
pub struct GenLine {
    pub criteria: Vec<Criterion>,
    pub families: Vec<PolicyFamily>,
}

fn arb_line() -> impl Strategy<Value = GenLine> {
    let criteria = prop::sample::subsequence(kinds(), 1..=3)
        .prop_flat_map(|kinds| kinds.into_iter().map(arb_criterion).collect::<Vec<_>>());
    let families = prop::sample::subsequence(PolicyFamily::ALL.to_vec(), 1..=5);
    (criteria, families).prop_map(|(criteria, families)| GenLine { criteria, families })
}

/// A generated rule set: a fallback assigning every family, then the lines.
#[derive(Debug, Clone)]
pub struct GenRuleSet {
    pub ranking: Ranking,
    pub lines: Vec<GenLine>,
}

impl GenRuleSet {
    /// Policy ids are `<family letter><source line>`; the fallback's are
    /// `<family letter>-fallback`.
    pub fn builder(&self) -> RuleSetBuilder {
        let fallback = PolicyFamily::ALL
            .into_iter()
            .fold(PolicyAssignments::new(), |acc, family| {
                acc.with(family, format!("{}-fallback", family.letter()))
            });
        let mut builder = RuleSetBuilder::new()
            .ranking(self.ranking.clone())
            .fallback(fallback);
        for (i, line) in self.lines.iter().enumerate() {
            let source_line = FALLBACK_LINE + 1 + i;
            let policies = line
                .families
                .iter()
                .fold(PolicyAssignments::new(), |acc, family| {
                    acc.with(*family, format!("{}{source_line}", family.letter()))
                });
            builder = builder.line(line.criteria.clone(), policies);
        }
        builder
    }

    pub fn compile(&self) -> RuleSet {
        self.builder().build().unwrap()
    }
}

pub fn arb_ruleset() -> impl Strategy<Value = GenRuleSet> {
    (arb_ranking(), prop::collection::vec(arb_line(), 0..12))
        .prop_map(|(ranking, lines)| GenRuleSet { ranking, lines })
}

/// A query with the four required ids and any subset of the ancestors.
pub fn arb_query() -> impl Strategy<Value = Query> {
    let name = || prop::sample::select(NAMES);
    (
        (name(), name(), name(), name()),
        (
            prop::option::of(name()),
            prop::option::of(name()),
            prop::option::of(name()),
        ),
    )
        .prop_map(|((m, t, g, s), (library, campus, institution))| {
            let mut query = Query::new(m, t, g, s);
            if let Some(id) = library {
                query = query.with_library(id);
            }
            if let Some(id) = campus {
                query = query.with_campus(id);
            }
            if let Some(id) = institution {
                query = query.with_institution(id);
            }
            query
        })
}

pub fn arb_family() -> impl Strategy<Value = PolicyFamily> {
    prop::sample::select(PolicyFamily::ALL.to_vec())
}
