//! Knowledge-base records: facts, rules and the concept taxonomy.
//!
//! These are the exact JSON shapes stored in `facts.json`, `rules.json` and
//! `taxonomy.json`. Optional fields carry explicit serde defaults so that a
//! record never needs to be re-interpreted at inference time.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::confidence::{FULL_CONFIDENCE, clamp01};

// ---------------------------------------------------------------------------
// Fact
// ---------------------------------------------------------------------------

/// A named concept with a baseline truth value.
///
/// Facts whose `value` is `true` can be pulled into a query as default
/// observations (`useTrueFacts`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Fact {
    pub id: String,
    pub description: String,
    pub value: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Fact {
    pub fn new(id: impl Into<String>, description: impl Into<String>, value: bool) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            value,
            tags: Vec::new(),
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

// ---------------------------------------------------------------------------
// Rule
// ---------------------------------------------------------------------------

/// An IF-all-conditions THEN-conclusion rule with an optional certainty factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Rule {
    pub id: String,
    pub conditions: Vec<String>,
    pub conclusion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certainty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explain: Option<String>,
}

impl Rule {
    /// Create a rule with full certainty and no explanation.
    pub fn new<I, S>(id: impl Into<String>, conditions: I, conclusion: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id: id.into(),
            conditions: conditions.into_iter().map(Into::into).collect(),
            conclusion: conclusion.into(),
            certainty: None,
            explain: None,
        }
    }

    /// Set the certainty factor.
    pub fn with_certainty(mut self, certainty: f64) -> Self {
        self.certainty = Some(certainty);
        self
    }

    /// Set the explanation text.
    pub fn with_explain(mut self, explain: impl Into<String>) -> Self {
        self.explain = Some(explain.into());
        self
    }

    /// Certainty factor clamped to `[0, 1]`, `1.0` when unspecified.
    pub fn certainty_factor(&self) -> f64 {
        clamp01(self.certainty.unwrap_or(FULL_CONFIDENCE))
    }

    /// Explanation text, empty when unspecified.
    pub fn explanation(&self) -> &str {
        self.explain.as_deref().unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Taxonomy
// ---------------------------------------------------------------------------

/// Concept hierarchy document: `{ "parent": { "child": "parent", ... } }`.
///
/// Keys other than `parent` are kept as-is so that saving a taxonomy never
/// drops annotations added by other tools.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    #[serde(default)]
    pub parent: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Taxonomy {
    pub fn new<I, K, V>(edges: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            parent: edges
                .into_iter()
                .map(|(c, p)| (c.into(), p.into()))
                .collect(),
            extra: Map::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn fact_tags_default_to_empty() {
        let fact: Fact =
            serde_json::from_value(json!({"id": "f1", "description": "d", "value": true}))
                .unwrap();
        assert!(fact.tags.is_empty());
        assert!(fact.value);
    }

    #[test]
    fn fact_rejects_unknown_fields() {
        let res: Result<Fact, _> = serde_json::from_value(
            json!({"id": "f1", "description": "d", "value": true, "weight": 2}),
        );
        assert!(res.is_err());
    }

    #[test]
    fn rule_defaults() {
        let rule: Rule = serde_json::from_value(
            json!({"id": "r1", "conditions": ["a"], "conclusion": "c"}),
        )
        .unwrap();
        assert_eq!(rule.certainty_factor(), 1.0);
        assert_eq!(rule.explanation(), "");
    }

    #[test]
    fn rule_certainty_is_clamped() {
        let rule = Rule::new("r1", ["a"], "c").with_certainty(1.7);
        assert_eq!(rule.certainty_factor(), 1.0);
        let rule = Rule::new("r1", ["a"], "c").with_certainty(-1.0);
        assert_eq!(rule.certainty_factor(), 0.0);
    }

    #[test]
    fn rule_omits_absent_optionals() {
        let json = serde_json::to_value(Rule::new("r1", ["a"], "c")).unwrap();
        assert!(json.get("certainty").is_none());
        assert!(json.get("explain").is_none());
    }

    #[test]
    fn taxonomy_keeps_extra_keys() {
        let tax: Taxonomy = serde_json::from_value(
            json!({"parent": {"cough": "respiratory"}, "labels": {"cough": "Cough"}}),
        )
        .unwrap();
        assert_eq!(tax.parent["cough"], "respiratory");
        let back = serde_json::to_value(&tax).unwrap();
        assert_eq!(back["labels"]["cough"], "Cough");
    }

    #[test]
    fn taxonomy_parent_defaults_to_empty() {
        let tax: Taxonomy = serde_json::from_value(json!({})).unwrap();
        assert!(tax.parent.is_empty());
    }
}
