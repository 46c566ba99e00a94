use std::sync::Arc;

use circulation_rules::{
    CacheSettings, Criterion as Term, CriterionKind, InMemoryRuleStorage, PolicyAssignments,
    PolicyFamily, Query, QueryParameters, RuleSet, RuleSetBuilder, RulesEngine,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

/// `n` lines on material type, half of them refined by patron group, and a
/// query that matches only the last material type.
fn build_rules(n: usize) -> (RuleSet, Query) {
    let mut builder = RuleSetBuilder::new().fallback(
        PolicyAssignments::new()
            .with(PolicyFamily::Loan, "lp-default")
            .with(PolicyFamily::Request, "rp-default"),
    );
    for i in 0..n {
        let mut criteria = vec![Term::new(CriterionKind::MaterialType, format!("m{i}"))];
        if i % 2 == 0 {
            criteria.push(Term::any_of(CriterionKind::PatronGroup, ["staff", "faculty"]));
        }
        builder = builder.line(
            criteria,
            PolicyAssignments::new().with(PolicyFamily::Loan, format!("lp{i}")),
        );
    }
    let rules = builder.build().unwrap();
    let query = Query::new(format!("m{}", n - 1), "regular", "staff", "shelf");
    (rules, query)
}

fn rules_text(n: usize) -> String {
    let (rules, _) = build_rules(n);
    let mut text = format!("priority: {}\n", rules.ranking());
    for line in rules.lines() {
        text.push_str(&line.to_string());
        text.push('\n');
    }
    text
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("apply");

    for &n in &[10, 100, 1000] {
        let (rules, query) = build_rules(n);
        group.bench_function(format!("{n}_lines_best"), |b| {
            b.iter(|| rules.apply(black_box(&query), PolicyFamily::Loan));
        });
        group.bench_function(format!("{n}_lines_all"), |b| {
            b.iter(|| rules.apply_all(black_box(&query), PolicyFamily::Loan));
        });
        group.bench_function(format!("{n}_lines_fallback_only"), |b| {
            b.iter(|| rules.apply(black_box(&query), PolicyFamily::Request));
        });
    }

    group.finish();
}

fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("compile");

    for &n in &[10, 100, 1000] {
        let text = rules_text(n);
        group.bench_function(format!("{n}_lines"), |b| {
            b.iter(|| RuleSet::from_text(black_box(&text)).unwrap());
        });
    }

    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let engine = RulesEngine::new(Arc::new(InMemoryRuleStorage::new()), CacheSettings::default());
    engine.replace_rule_text("diku", rules_text(100), true).unwrap();
    let params = QueryParameters::required(
        "96d4bdf1-5fc2-40ef-9ace-6d7e3e48ec4d",
        "2e6f51b9-d00a-4f1d-9960-49b1977acfca",
        "0122feae-bd0e-4405-88de-525d93ba7cfd",
        "6a475259-8a97-4992-a415-76440f5f7c23",
    );

    c.bench_function("engine_cache_hit", |b| {
        b.iter(|| {
            engine
                .apply_rules("diku", PolicyFamily::Loan, black_box(&params))
                .unwrap()
        });
    });
}

criterion_group!(benches, bench_apply, bench_compile, bench_engine);
criterion_main!(benches);
