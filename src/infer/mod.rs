//! Certainty-factor forward chaining.
//!
//! Observations (concept ids with an optional weight) are turned into a
//! confidence map, confidence is propagated up the taxonomy, every rule is
//! evaluated against the expanded map, and the conclusions of the rules that
//! fire are ranked by their best score.
//!
//! ```text
//! observed ids + weights ──► confidence map ──► expand (taxonomy)
//!        ──► evaluate each rule ──► fired rules
//!        ──► best score per conclusion ──► ranking
//! ```

pub mod engine;
pub mod evaluate;
pub mod propagate;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub use engine::InferEngine;
pub use evaluate::{Evaluation, evaluate};
pub use propagate::expand;

/// Concept id → confidence in `[0, 1]`. Built per inference call.
pub type ConfidenceMap = BTreeMap<String, f64>;

/// Input of a single inference call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceQuery {
    /// Concept ids observed to hold.
    pub observed: BTreeSet<String>,
    /// Per-concept confidence overrides. Values are clamped to `[0, 1]`;
    /// observed concepts without a weight get full confidence.
    pub weights: BTreeMap<String, f64>,
    /// Also observe every fact whose baseline value is `true`.
    pub include_baseline_true: bool,
}

impl InferenceQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observed concept.
    pub fn observe(mut self, concept: impl Into<String>) -> Self {
        self.observed.insert(concept.into());
        self
    }

    /// Set the confidence weight for a concept.
    pub fn with_weight(mut self, concept: impl Into<String>, weight: f64) -> Self {
        self.weights.insert(concept.into(), weight);
        self
    }

    /// Toggle inclusion of baseline-true facts.
    pub fn with_baseline_true(mut self, include: bool) -> Self {
        self.include_baseline_true = include;
        self
    }
}

/// A rule that fired, with its rounded score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiredRule {
    pub rule: String,
    pub conclusion: String,
    pub score: f64,
    pub explain: String,
    pub conditions: Vec<String>,
}

/// A conclusion with the best score of any rule that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedConclusion {
    pub conclusion: String,
    pub score: f64,
}

/// One entry of the expanded confidence map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub id: String,
    pub confidence: f64,
}

/// Output of a single inference call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    /// Fired rules in knowledge-base order.
    pub matched_rules: Vec<FiredRule>,
    /// Conclusions by descending score; ties in lexical order of conclusion id.
    pub ranked_conclusions: Vec<RankedConclusion>,
    /// Expanded confidence map, sorted by concept id.
    pub observations: Vec<Observation>,
}

impl InferenceResult {
    /// The highest-ranked conclusion, if any rule fired.
    pub fn best(&self) -> Option<&RankedConclusion> {
        self.ranked_conclusions.first()
    }

    /// Expanded confidence of a concept, `0.0` when it was never reached.
    pub fn confidence_of(&self, concept: &str) -> f64 {
        self.observations
            .iter()
            .find(|o| o.id == concept)
            .map_or(0.0, |o| o.confidence)
    }
}
