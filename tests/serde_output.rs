#![cfg(feature = "serde")]

use circulation_rules::{CacheSettings, PolicyFamily, Query, RuleMatch, RuleSet};
use serde_json::json;

const RULES: &str = "\
priority: t, s, c, b, a, m, g
fallback-policy: l lp2 r rp1
m book: l lp3
    g staff: l lp4
";

#[test]
fn rule_match_json_shape() {
    let rules = RuleSet::from_text(RULES).unwrap();
    let query = Query::new("book", "regular", "staff", "shelf");
    let best = rules.apply(&query, PolicyFamily::Loan).unwrap();

    let value = serde_json::to_value(&best).unwrap();
    assert_eq!(
        value,
        json!({
            "policyId": "lp4",
            "family": "loan",
            "sourceLine": 4,
            "highestKind": "material-type",
            "appliedRuleConditions": {
                "materialTypeMatch": true,
                "loanTypeMatch": false,
                "patronGroupMatch": true
            }
        })
    );

    let back: RuleMatch = serde_json::from_value(value).unwrap();
    assert_eq!(back, best);
}

#[test]
fn report_skips_duration() {
    let rules = RuleSet::from_text(RULES).unwrap();
    let query = Query::new("book", "regular", "student", "shelf");
    let report = rules.apply_detailed(&query, PolicyFamily::Loan);

    let value = serde_json::to_value(&report).unwrap();
    assert_eq!(value["family"], "loan");
    assert_eq!(value["matches"].as_array().map(Vec::len), Some(2));
    assert!(value.get("duration").is_none());
}

#[test]
fn fallback_match_has_no_kind() {
    let rules = RuleSet::from_text(RULES).unwrap();
    let query = Query::new("dvd", "regular", "student", "shelf");
    let value = serde_json::to_value(rules.apply(&query, PolicyFamily::Request).unwrap()).unwrap();
    assert_eq!(value["family"], "request");
    assert_eq!(value["highestKind"], serde_json::Value::Null);
    assert_eq!(value["sourceLine"], 2);
}

#[test]
fn cache_settings_fill_defaults() {
    let settings: CacheSettings = serde_json::from_str(r#"{"set_ttl_ms": 100}"#).unwrap();
    assert_eq!(settings.set_ttl_ms, 100);
    assert_eq!(settings.fetch_ttl_ms, CacheSettings::default().fetch_ttl_ms);
}
