//! End-to-end integration tests for the cf-expert engine.
//!
//! These tests exercise the full pipeline from knowledge-base construction
//! through taxonomy propagation, rule evaluation and ranking, and check the
//! behavioral properties callers rely on.

use std::sync::Arc;
use std::thread;

use serde_json::json;

use cf_expert::infer::{ConfidenceMap, InferEngine, InferenceQuery, expand};
use cf_expert::kb::{Fact, KnowledgeBase, Rule, Taxonomy};
use cf_expert::request::{InferRequest, query_from_params};
use cf_expert::taxonomy::TaxonomyIndex;

fn engine_with(facts: Vec<Fact>, rules: Vec<Rule>, edges: &[(&str, &str)]) -> InferEngine {
    let kb = KnowledgeBase::new(facts, rules, Taxonomy::new(edges.iter().copied())).unwrap();
    InferEngine::new(Arc::new(kb))
}

fn clinic() -> InferEngine {
    engine_with(
        vec![
            Fact::new("cough", "Persistent cough", true),
            Fact::new("fever", "Body temperature above 38C", false),
            Fact::new("sneezing", "Frequent sneezing", false),
        ],
        vec![
            Rule::new("r1", ["respiratory"], "flu")
                .with_certainty(0.8)
                .with_explain("respiratory symptoms suggest flu"),
            Rule::new("r2", ["respiratory", "fever"], "pneumonia").with_certainty(0.9),
            Rule::new("r3", ["sneezing"], "cold").with_certainty(0.6),
            Rule::new("r4", ["fever"], "flu").with_certainty(0.5),
        ],
        &[
            ("cough", "respiratory"),
            ("sneezing", "respiratory"),
            ("respiratory", "symptom"),
            ("fever", "symptom"),
        ],
    )
}

#[test]
fn flu_scenario() {
    let engine = engine_with(
        Vec::new(),
        vec![Rule::new("r1", ["respiratory"], "flu").with_certainty(0.8)],
        &[("cough", "respiratory")],
    );
    let result = engine.infer(&InferenceQuery::new().observe("cough"));

    assert_eq!(result.confidence_of("respiratory"), 1.0);
    assert_eq!(result.matched_rules.len(), 1);
    assert_eq!(result.matched_rules[0].score, 0.8);
    assert_eq!(result.ranked_conclusions.len(), 1);
    assert_eq!(result.ranked_conclusions[0].conclusion, "flu");
    assert_eq!(result.ranked_conclusions[0].score, 0.8);
}

#[test]
fn propagation_is_order_independent() {
    let index = TaxonomyIndex::new([("a", "root"), ("b", "root")]);
    let forward = expand(
        &index,
        &ConfidenceMap::from([("a".to_string(), 0.9), ("b".to_string(), 0.4)]),
    );
    let backward = expand(
        &index,
        &ConfidenceMap::from([("b".to_string(), 0.4), ("a".to_string(), 0.9)]),
    );
    assert_eq!(forward.get("root"), Some(&0.9));
    assert_eq!(forward, backward);
}

#[test]
fn and_gate_needs_every_condition() {
    let engine = engine_with(
        Vec::new(),
        vec![Rule::new("r1", ["x", "y"], "z").with_certainty(1.0)],
        &[],
    );
    let result = engine.infer(&InferenceQuery::new().observe("x").with_weight("x", 0.8));
    assert!(result.matched_rules.is_empty());
    assert!(result.ranked_conclusions.is_empty());
}

#[test]
fn weakest_link_scoring() {
    let engine = engine_with(
        Vec::new(),
        vec![Rule::new("r1", ["a", "b", "c"], "z").with_certainty(0.5)],
        &[],
    );
    let query = InferenceQuery::new()
        .observe("a")
        .observe("b")
        .observe("c")
        .with_weight("a", 0.9)
        .with_weight("b", 0.3)
        .with_weight("c", 0.6);
    let result = engine.infer(&query);
    assert_eq!(result.matched_rules[0].score, 0.15);
}

#[test]
fn weights_are_clamped() {
    let engine = engine_with(Vec::new(), Vec::new(), &[]);
    let query = InferenceQuery::new()
        .observe("hi")
        .observe("lo")
        .with_weight("hi", 1.5)
        .with_weight("lo", -0.2);
    let result = engine.infer(&query);
    assert_eq!(result.confidence_of("hi"), 1.0);
    assert_eq!(result.confidence_of("lo"), 0.0);
}

#[test]
fn ties_rank_in_lexical_order() {
    let engine = engine_with(
        Vec::new(),
        vec![
            Rule::new("r1", ["s"], "zeta").with_certainty(0.42),
            Rule::new("r2", ["s"], "alpha").with_certainty(0.42),
            Rule::new("r3", ["s"], "mid").with_certainty(0.9),
        ],
        &[],
    );
    for _ in 0..5 {
        let result = engine.infer(&InferenceQuery::new().observe("s"));
        let order: Vec<&str> = result
            .ranked_conclusions
            .iter()
            .map(|c| c.conclusion.as_str())
            .collect();
        assert_eq!(order, vec!["mid", "alpha", "zeta"]);
    }
}

#[test]
fn baseline_round_trip() {
    let engine = engine_with(
        vec![Fact::new("f1", "one", true), Fact::new("f2", "two", false)],
        Vec::new(),
        &[],
    );
    let query = InferRequest::from_json(&json!({
        "facts": [],
        "weights": {},
        "useTrueFacts": true
    }))
    .into_query();
    let result = engine.infer(&query);

    assert_eq!(result.confidence_of("f1"), 1.0);
    assert!(result.observations.iter().all(|o| o.id != "f2"));
}

#[test]
fn best_score_per_conclusion_wins() {
    let result = clinic().infer(&InferenceQuery::new().observe("cough").observe("fever"));

    let flu: Vec<_> = result
        .matched_rules
        .iter()
        .filter(|r| r.conclusion == "flu")
        .collect();
    assert_eq!(flu.len(), 2);

    let order: Vec<(&str, f64)> = result
        .ranked_conclusions
        .iter()
        .map(|c| (c.conclusion.as_str(), c.score))
        .collect();
    assert_eq!(order, vec![("pneumonia", 0.9), ("flu", 0.8)]);
    assert_eq!(result.best().map(|c| c.conclusion.as_str()), Some("pneumonia"));
}

#[test]
fn observations_sorted_and_include_ancestors() {
    let query = InferenceQuery::new()
        .observe("sneezing")
        .with_weight("sneezing", 0.7);
    let result = clinic().infer(&query);
    let ids: Vec<&str> = result.observations.iter().map(|o| o.id.as_str()).collect();
    assert_eq!(ids, vec!["respiratory", "sneezing", "symptom"]);
    assert!(result.observations.iter().all(|o| o.confidence == 0.7));

    let order: Vec<(&str, f64)> = result
        .ranked_conclusions
        .iter()
        .map(|c| (c.conclusion.as_str(), c.score))
        .collect();
    assert_eq!(order, vec![("flu", 0.56), ("cold", 0.42)]);
}

#[test]
fn unknown_concepts_are_harmless() {
    let result = clinic().infer(&InferenceQuery::new().observe("nonexistent"));
    assert!(result.matched_rules.is_empty());
    assert_eq!(result.confidence_of("nonexistent"), 1.0);
    assert_eq!(result.confidence_of("respiratory"), 0.0);
}

#[test]
fn inference_is_deterministic() {
    let engine = clinic();
    let query = InferenceQuery::new()
        .observe("cough")
        .observe("fever")
        .with_weight("fever", 0.35)
        .with_baseline_true(true);
    let first = serde_json::to_string(&engine.infer(&query)).unwrap();
    for _ in 0..10 {
        assert_eq!(serde_json::to_string(&engine.infer(&query)).unwrap(), first);
    }
}

#[test]
fn concurrent_inference_on_one_snapshot() {
    let engine = clinic();
    let expected = engine.infer(&InferenceQuery::new().observe("cough"));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let engine = engine.clone();
            thread::spawn(move || engine.infer(&InferenceQuery::new().observe("cough")))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

#[test]
fn query_string_parameters_drive_the_engine() {
    let query = query_from_params("cough, fever", "fever:0.4,cough:oops", "TRUE");
    let result = clinic().infer(&query);

    assert_eq!(result.confidence_of("cough"), 1.0);
    assert_eq!(result.confidence_of("fever"), 0.4);
    assert_eq!(result.confidence_of("symptom"), 1.0);

    let pneumonia = result
        .ranked_conclusions
        .iter()
        .find(|c| c.conclusion == "pneumonia")
        .unwrap();
    assert_eq!(pneumonia.score, 0.36);
}

#[test]
fn result_serializes_with_wire_field_names() {
    let result = clinic().infer(&InferenceQuery::new().observe("cough"));
    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(json["matched_rules"][0]["rule"], "r1");
    assert_eq!(json["matched_rules"][0]["explain"], "respiratory symptoms suggest flu");
    assert_eq!(json["matched_rules"][0]["conditions"], json!(["respiratory"]));
    assert_eq!(json["ranked_conclusions"][0], json!({"conclusion": "flu", "score": 0.8}));
    assert_eq!(json["observations"][0], json!({"id": "cough", "confidence": 1.0}));
}
