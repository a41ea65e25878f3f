//! Contract tests for batch filtering, ranking and lookups

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::search::filter::{
    filter, filter_candidates, filter_candidates_with, FilterOptions, Lookup,
};
use crate::search::matcher::MatchOptions;

fn people() -> Vec<Value> {
    vec![
        json!({"key": "Jordan Humphreys", "value": "Jordan", "email": "getstarted@zurb.com"}),
        json!({"key": "Sir Walter Riley", "value": "Sir Walter", "email": "walter@zurb.com"}),
        json!({"key": "Joachim", "value": "Joachim", "email": "jo@example.com"}),
    ]
}

// ============================================================================
// Ranking Contract Tests
// ============================================================================

#[test]
fn test_stable_order_on_equal_scores() {
    let items = vec!["abc", "abd", "xab"];
    let ranked = filter("a", &items, |s| Some(s.to_string()), &MatchOptions::default());

    let order: Vec<usize> = ranked.iter().map(|r| r.source_index).collect();
    assert_eq!(order, vec![0, 1, 2]);
    assert!(ranked.iter().all(|r| r.score == 1));
}

#[test]
fn test_higher_score_ranks_first() {
    let items = vec!["a_b", "ab", "zzz", "xab"];
    let ranked = filter("ab", &items, |s| Some(s.to_string()), &MatchOptions::default());

    let order: Vec<(usize, u64)> = ranked.iter().map(|r| (r.source_index, r.score)).collect();
    assert_eq!(order, vec![(1, 4), (3, 4), (0, 2)]);
}

#[test]
fn test_non_matches_are_excluded() {
    let items = vec!["alpha", "beta", "gamma"];
    let ranked = filter("mm", &items, |s| Some(s.to_string()), &MatchOptions::default());
    assert_eq!(ranked.len(), 1);
    assert_eq!(*ranked[0].original, "gamma");
}

#[test]
fn test_no_limit_applied() {
    let items: Vec<String> = (0..500).map(|i| format!("item{}", i)).collect();
    let ranked = filter("", &items, |s| Some(s.clone()), &MatchOptions::default());
    assert_eq!(ranked.len(), 500);
}

#[test]
fn test_empty_input() {
    let items: Vec<String> = Vec::new();
    assert!(filter("a", &items, |s| Some(s.clone()), &MatchOptions::default()).is_empty());
}

#[test]
fn test_missing_extraction_counts_as_empty() {
    let items = vec![Some("abc"), None];
    let extract = |s: &Option<&str>| s.map(str::to_string);

    let all = filter("", &items, extract, &MatchOptions::default());
    assert_eq!(all.len(), 2);
    assert_eq!(all[1].display_string, "");

    let some = filter("a", &items, extract, &MatchOptions::default());
    assert_eq!(some.len(), 1);
    assert_eq!(some[0].source_index, 0);
}

// ============================================================================
// Lookup Contract Tests
// ============================================================================

#[test]
fn test_key_lookup_on_json_values() {
    let items = people();
    let opts = FilterOptions::new(Lookup::key("key"), MatchOptions::highlighted("<b>", "</b>"));

    let ranked = filter_candidates("jo", &items, &opts);
    assert_eq!(ranked.len(), 2);
    // Both start with a contiguous "jo": tie keeps input order
    assert_eq!(ranked[0].source_index, 0);
    assert_eq!(ranked[0].display_string, "<b>J</b><b>o</b>rdan Humphreys");
    assert_eq!(ranked[1].original["value"], "Joachim");
}

#[test]
fn test_key_lookup_missing_attribute() {
    let items = people();
    let opts = FilterOptions::new(Lookup::key("nickname"), MatchOptions::default());

    assert_eq!(filter_candidates("", &items, &opts).len(), 3);
    assert!(filter_candidates("j", &items, &opts).is_empty());
}

#[test]
fn test_function_lookup_combines_fields() {
    let items = people();
    let lookup = Lookup::function(|item: &Value, _query: &str| {
        Some(format!(
            "{} {}",
            item["key"].as_str().unwrap_or_default(),
            item["email"].as_str().unwrap_or_default()
        ))
    });
    let opts = FilterOptions::new(lookup, MatchOptions::default());

    let ranked = filter_candidates("zurb", &items, &opts);
    let order: Vec<usize> = ranked.iter().map(|r| r.source_index).collect();
    assert_eq!(order, vec![0, 1]);
}

#[test]
fn test_function_lookup_sees_query() {
    let items = vec![json!({"key": "a"}), json!({"key": "b"})];
    // Every item searchable as the query itself
    let lookup = Lookup::function(|_item: &Value, query: &str| Some(query.to_string()));
    let opts = FilterOptions::new(lookup, MatchOptions::default());

    assert_eq!(filter_candidates("zz", &items, &opts).len(), 2);
}

#[test]
fn test_function_lookup_on_plain_strings() {
    let items = vec!["Ada".to_string(), "Grace".to_string()];
    let lookup = Lookup::function(|item: &String, _query: &str| Some(item.clone()));
    let opts = FilterOptions::new(lookup, MatchOptions::default());

    let ranked = filter_candidates("gr", &items, &opts);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].source_index, 1);
}

#[test]
fn test_key_lookup_on_plain_strings_finds_nothing() {
    let items = vec!["Ada", "Grace"];
    let opts = FilterOptions::new(Lookup::default(), MatchOptions::default());

    assert!(filter_candidates("a", &items, &opts).is_empty());
    assert_eq!(filter_candidates("", &items, &opts).len(), 2);
}

#[test]
fn test_filter_with_own_key_reader() {
    struct Contact {
        handle: &'static str,
    }
    let items = vec![Contact { handle: "ada" }, Contact { handle: "grace" }];

    let by_key = FilterOptions::new(Lookup::key("handle"), MatchOptions::default());
    let ranked = filter_candidates_with("gr", &items, &by_key, |c: &Contact, key: &str| {
        (key == "handle").then(|| c.handle.to_string())
    });
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].source_index, 1);

    let by_fn = FilterOptions::new(
        Lookup::function(|c: &Contact, _q: &str| Some(c.handle.to_uppercase())),
        MatchOptions::default(),
    );
    let ranked = filter_candidates_with("ADA", &items, &by_fn, |_: &Contact, _: &str| None);
    assert_eq!(ranked[0].display_string, "ADA");
}

#[test]
fn test_map_lookup() {
    let mut a = HashMap::new();
    a.insert("name".to_string(), "Ada".to_string());
    let mut b = HashMap::new();
    b.insert("name".to_string(), "Grace".to_string());
    let items = vec![a, b];

    let opts = FilterOptions::new(Lookup::key("name"), MatchOptions::default());
    let ranked = filter_candidates("gr", &items, &opts);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].source_index, 1);
}

#[test]
fn test_serialized_shape() {
    let items = people();
    let opts = FilterOptions::new(Lookup::key("value"), MatchOptions::default());
    let ranked = filter_candidates("sir", &items, &opts);

    let json = serde_json::to_value(&ranked).unwrap();
    assert_eq!(json[0]["string"], "Sir Walter");
    assert_eq!(json[0]["score"], 11);
    assert_eq!(json[0]["index"], 1);
    assert_eq!(json[0]["original"]["email"], "walter@zurb.com");
}
