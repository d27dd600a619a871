//! Inference engine: observations → expanded confidences → fired rules → ranking.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::confidence::{FULL_CONFIDENCE, clamp01, round_score};
use crate::kb::KnowledgeBase;

use super::{
    ConfidenceMap, FiredRule, InferenceQuery, InferenceResult, Observation, RankedConclusion,
    evaluate, expand,
};

/// Stateless inference engine over one knowledge-base snapshot.
///
/// Cloning is cheap and every call to [`infer`](Self::infer) builds its own
/// working state, so one engine can serve many threads at once.
#[derive(Debug, Clone)]
pub struct InferEngine {
    kb: Arc<KnowledgeBase>,
}

impl InferEngine {
    pub fn new(kb: Arc<KnowledgeBase>) -> Self {
        Self { kb }
    }

    /// The snapshot this engine reads from.
    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.kb
    }

    /// Initial confidence map: every observed concept (plus baseline-true
    /// facts when requested) at its clamped weight, `1.0` by default.
    pub fn initial_confidences(&self, query: &InferenceQuery) -> ConfidenceMap {
        let baseline = query
            .include_baseline_true
            .then(|| self.kb.baseline_true().iter())
            .into_iter()
            .flatten();

        query
            .observed
            .iter()
            .chain(baseline)
            .map(|id| {
                let weight = query.weights.get(id).copied().unwrap_or(FULL_CONFIDENCE);
                (id.clone(), clamp01(weight))
            })
            .collect()
    }

    /// Run one forward-chaining pass.
    pub fn infer(&self, query: &InferenceQuery) -> InferenceResult {
        let initial = self.initial_confidences(query);
        let confidences = expand(self.kb.taxonomy_index(), &initial);

        let mut matched_rules = Vec::new();
        for rule in self.kb.rules() {
            let eval = evaluate(rule, &confidences);
            if eval.fires && eval.score > 0.0 {
                matched_rules.push(FiredRule {
                    rule: rule.id.clone(),
                    conclusion: rule.conclusion.clone(),
                    score: round_score(eval.score),
                    explain: rule.explanation().to_string(),
                    conditions: rule.conditions.clone(),
                });
            }
        }

        let ranked_conclusions = rank(&matched_rules);

        tracing::debug!(
            observed = initial.len(),
            expanded = confidences.len(),
            fired = matched_rules.len(),
            conclusions = ranked_conclusions.len(),
            "inference complete"
        );

        InferenceResult {
            matched_rules,
            ranked_conclusions,
            observations: confidences
                .into_iter()
                .map(|(id, confidence)| Observation { id, confidence })
                .collect(),
        }
    }
}

/// Best score per conclusion, highest first.
///
/// Aggregation goes through an ordered map so that conclusions tied on score
/// come out in lexical order after the stable sort.
fn rank(fired: &[FiredRule]) -> Vec<RankedConclusion> {
    let mut best: BTreeMap<&str, f64> = BTreeMap::new();
    for f in fired {
        let slot = best.entry(f.conclusion.as_str()).or_insert(0.0);
        if f.score > *slot {
            *slot = f.score;
        }
    }

    let mut ranked: Vec<RankedConclusion> = best
        .into_iter()
        .map(|(conclusion, score)| RankedConclusion {
            conclusion: conclusion.to_string(),
            score: round_score(score),
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::{Fact, Rule, Taxonomy};

    fn engine(facts: Vec<Fact>, rules: Vec<Rule>, taxonomy: Taxonomy) -> InferEngine {
        InferEngine::new(Arc::new(KnowledgeBase::new(facts, rules, taxonomy).unwrap()))
    }

    #[test]
    fn flu_scenario() {
        let engine = engine(
            Vec::new(),
            vec![Rule::new("r1", ["respiratory"], "flu").with_certainty(0.8)],
            Taxonomy::new([("cough", "respiratory")]),
        );
        let result = engine.infer(&InferenceQuery::new().observe("cough"));

        assert_eq!(result.confidence_of("respiratory"), 1.0);
        assert_eq!(result.matched_rules.len(), 1);
        assert_eq!(result.matched_rules[0].score, 0.8);
        assert_eq!(
            result.ranked_conclusions,
            vec![RankedConclusion {
                conclusion: "flu".into(),
                score: 0.8
            }]
        );
    }

    #[test]
    fn weights_are_clamped() {
        let engine = engine(Vec::new(), Vec::new(), Taxonomy::default());
        let query = InferenceQuery::new()
            .observe("hi")
            .observe("lo")
            .with_weight("hi", 1.5)
            .with_weight("lo", -0.2);
        let init = engine.initial_confidences(&query);
        assert_eq!(init["hi"], 1.0);
        assert_eq!(init["lo"], 0.0);
    }

    #[test]
    fn weights_for_unobserved_concepts_are_ignored() {
        let engine = engine(Vec::new(), Vec::new(), Taxonomy::default());
        let query = InferenceQuery::new().with_weight("ghost", 0.9);
        assert!(engine.infer(&query).observations.is_empty());
    }

    #[test]
    fn baseline_facts_only_when_requested() {
        let engine = engine(
            vec![Fact::new("f1", "on", true), Fact::new("f2", "off", false)],
            Vec::new(),
            Taxonomy::default(),
        );

        let with = engine.infer(&InferenceQuery::new().with_baseline_true(true));
        assert_eq!(
            with.observations,
            vec![Observation {
                id: "f1".into(),
                confidence: 1.0
            }]
        );

        let without = engine.infer(&InferenceQuery::new());
        assert!(without.observations.is_empty());
    }

    #[test]
    fn explicit_weight_applies_to_baseline_fact() {
        let engine = engine(
            vec![Fact::new("f1", "on", true)],
            Vec::new(),
            Taxonomy::default(),
        );
        let query = InferenceQuery::new()
            .with_baseline_true(true)
            .with_weight("f1", 0.4);
        assert_eq!(engine.infer(&query).confidence_of("f1"), 0.4);
    }

    #[test]
    fn ties_break_lexically() {
        let engine = engine(
            Vec::new(),
            vec![
                Rule::new("r1", ["x"], "zeta").with_certainty(0.42),
                Rule::new("r2", ["x"], "alpha").with_certainty(0.42),
                Rule::new("r3", ["x"], "mid").with_certainty(0.9),
            ],
            Taxonomy::default(),
        );
        let result = engine.infer(&InferenceQuery::new().observe("x"));
        let order: Vec<&str> = result
            .ranked_conclusions
            .iter()
            .map(|r| r.conclusion.as_str())
            .collect();
        assert_eq!(order, vec!["mid", "alpha", "zeta"]);
    }

    #[test]
    fn best_score_per_conclusion() {
        let engine = engine(
            Vec::new(),
            vec![
                Rule::new("weak", ["x"], "flu").with_certainty(0.3),
                Rule::new("strong", ["x", "y"], "flu").with_certainty(0.9),
            ],
            Taxonomy::default(),
        );
        let query = InferenceQuery::new()
            .observe("x")
            .observe("y")
            .with_weight("y", 0.5);
        let result = engine.infer(&query);
        assert_eq!(result.matched_rules.len(), 2);
        assert_eq!(result.ranked_conclusions.len(), 1);
        assert_eq!(result.best().map(|r| r.score), Some(0.45));
    }

    #[test]
    fn zero_score_rules_are_not_reported() {
        let engine = engine(
            Vec::new(),
            vec![Rule::new("r0", ["x"], "c").with_certainty(0.0)],
            Taxonomy::default(),
        );
        let result = engine.infer(&InferenceQuery::new().observe("x"));
        assert!(result.matched_rules.is_empty());
        assert!(result.ranked_conclusions.is_empty());
    }

    #[test]
    fn scores_are_rounded() {
        let engine = engine(
            Vec::new(),
            vec![Rule::new("r", ["x"], "c").with_certainty(0.5)],
            Taxonomy::default(),
        );
        let query = InferenceQuery::new().observe("x").with_weight("x", 0.3334);
        let result = engine.infer(&query);
        assert_eq!(result.matched_rules[0].score, 0.167);
        // Observations keep full precision.
        assert_eq!(result.confidence_of("x"), 0.3334);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let engine = engine(
            vec![Fact::new("f1", "on", true)],
            vec![
                Rule::new("r1", ["f1", "group"], "a").with_certainty(0.6),
                Rule::new("r2", ["x"], "b").with_explain("because x"),
            ],
            Taxonomy::new([("f1", "group"), ("x", "group")]),
        );
        let query = InferenceQuery::new()
            .observe("x")
            .with_weight("x", 0.7)
            .with_baseline_true(true);
        let first = engine.infer(&query);
        for _ in 0..5 {
            assert_eq!(engine.infer(&query), first);
        }
        assert_eq!(first.matched_rules[1].explain, "because x");
    }
}
