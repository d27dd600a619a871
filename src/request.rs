//! Request boundary: loosely-typed inference requests → [`InferenceQuery`].
//!
//! Two shapes are accepted. A JSON body:
//!
//! ```json
//! { "facts": ["cough", "fever"], "weights": { "fever": 0.6 }, "useTrueFacts": false }
//! ```
//!
//! and query-string style parameters (`facts=cough,fever`,
//! `weights=fever:0.6,cough:0.9`, `useTrueFacts=true`). Malformed pieces are
//! dropped here rather than reported: a weight that is not a number simply
//! falls back to full confidence, and a non-string fact id is ignored.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;

use crate::confidence::{parse_weight, parse_weight_str};
use crate::infer::InferenceQuery;

/// JSON inference request body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InferRequest {
    pub facts: Value,
    pub weights: Value,
    #[serde(rename = "useTrueFacts", alias = "use_true_facts")]
    pub use_true_facts: Value,
}

impl InferRequest {
    /// Parse a JSON body. Anything that is not an object yields an empty request.
    pub fn from_json(body: &Value) -> Self {
        Self::deserialize(body).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "unusable inference request body, using defaults");
            Self::default()
        })
    }

    pub fn into_query(self) -> InferenceQuery {
        self.into_query_with_baseline_default(false)
    }

    /// Like [`into_query`](Self::into_query), but a body that does not set
    /// `useTrueFacts` (absent or `null`) gets `default` instead of `false`.
    pub fn into_query_with_baseline_default(self, default: bool) -> InferenceQuery {
        InferenceQuery {
            observed: self
                .facts
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            weights: self
                .weights
                .as_object()
                .into_iter()
                .flatten()
                .filter_map(|(id, raw)| parse_weight(raw).map(|w| (id.clone(), w)))
                .collect(),
            include_baseline_true: match &self.use_true_facts {
                Value::Bool(b) => *b,
                Value::String(s) => parse_flag(s),
                Value::Null => default,
                _ => false,
            },
        }
    }
}

/// Split `"a, b,,c"` into trimmed, non-empty ids.
pub fn parse_fact_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `"a:0.5,b:0.9"` into weights, skipping malformed pairs.
pub fn parse_weight_pairs(raw: &str) -> BTreeMap<String, f64> {
    raw.split(',')
        .filter_map(|pair| {
            let (id, value) = pair.split_once(':')?;
            let id = id.trim();
            if id.is_empty() {
                return None;
            }
            parse_weight_str(value).map(|w| (id.to_string(), w))
        })
        .collect()
}

/// `"true"` in any case is true; everything else is false.
pub fn parse_flag(raw: &str) -> bool {
    raw.trim().eq_ignore_ascii_case("true")
}

/// Build a query from query-string style parameters.
pub fn query_from_params(facts: &str, weights: &str, use_true_facts: &str) -> InferenceQuery {
    InferenceQuery {
        observed: parse_fact_list(facts),
        weights: parse_weight_pairs(weights),
        include_baseline_true: parse_flag(use_true_facts),
    }
}
