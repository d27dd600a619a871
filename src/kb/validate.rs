//! Structural validation of knowledge-base documents.
//!
//! Shape errors (missing or mistyped fields, unknown fields) come from serde
//! while deserializing each array element on its own, so every problem is
//! reported with the index of the record it came from. Semantic checks (empty
//! ids, duplicates, certainty range, taxonomy cycles) run over the records that
//! did parse.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{KbError, KbResult, ValidationIssue};
use crate::taxonomy::TaxonomyIndex;

use super::model::{Fact, Rule, Taxonomy};

pub const FACTS: &str = "facts";
pub const RULES: &str = "rules";
pub const TAXONOMY: &str = "taxonomy";

fn at(index: usize, field: Option<&str>) -> Vec<String> {
    let mut path = vec![index.to_string()];
    if let Some(field) = field {
        path.push(field.to_string());
    }
    path
}

// ---------------------------------------------------------------------------
// Semantic checks
// ---------------------------------------------------------------------------

fn check_unique<'a>(
    file: &str,
    ids: impl Iterator<Item = (usize, &'a str)>,
    issues: &mut Vec<ValidationIssue>,
) {
    let mut first_seen: HashMap<&str, usize> = HashMap::new();
    for (index, id) in ids {
        if id.is_empty() {
            continue;
        }
        if let Some(&first) = first_seen.get(id) {
            issues.push(ValidationIssue::new(
                file,
                at(index, Some("id")),
                format!("duplicate id \"{id}\" (first defined at index {first})"),
            ));
        } else {
            first_seen.insert(id, index);
        }
    }
}

fn check_facts<'a>(
    facts: impl Iterator<Item = (usize, &'a Fact)> + Clone,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (index, fact) in facts.clone() {
        if fact.id.trim().is_empty() {
            issues.push(ValidationIssue::new(FACTS, at(index, Some("id")), "must not be empty"));
        }
    }
    check_unique(FACTS, facts.map(|(i, f)| (i, f.id.as_str())), &mut issues);
    issues
}

fn check_rules<'a>(
    rules: impl Iterator<Item = (usize, &'a Rule)> + Clone,
) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (index, rule) in rules.clone() {
        if rule.id.trim().is_empty() {
            issues.push(ValidationIssue::new(RULES, at(index, Some("id")), "must not be empty"));
        }
        if rule.conditions.is_empty() {
            issues.push(ValidationIssue::new(
                RULES,
                at(index, Some("conditions")),
                "must contain at least one condition",
            ));
        }
        for (ci, condition) in rule.conditions.iter().enumerate() {
            if condition.trim().is_empty() {
                let mut path = at(index, Some("conditions"));
                path.push(ci.to_string());
                issues.push(ValidationIssue::new(RULES, path, "must not be empty"));
            }
        }
        if rule.conclusion.trim().is_empty() {
            issues.push(ValidationIssue::new(
                RULES,
                at(index, Some("conclusion")),
                "must not be empty",
            ));
        }
        if let Some(cf) = rule.certainty {
            if !cf.is_finite() || !(0.0..=1.0).contains(&cf) {
                issues.push(ValidationIssue::new(
                    RULES,
                    at(index, Some("certainty")),
                    format!("{cf} is outside [0, 1]"),
                ));
            }
        }
    }
    check_unique(RULES, rules.map(|(i, r)| (i, r.id.as_str())), &mut issues);
    issues
}

/// Check a parsed fact list.
pub fn validate_facts(facts: &[Fact]) -> Vec<ValidationIssue> {
    check_facts(facts.iter().enumerate())
}

/// Check a parsed rule list.
pub fn validate_rules(rules: &[Rule]) -> Vec<ValidationIssue> {
    check_rules(rules.iter().enumerate())
}

/// Check a taxonomy: no empty concept ids and no cycles.
pub fn validate_taxonomy(taxonomy: &Taxonomy) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (child, parent) in &taxonomy.parent {
        if child.trim().is_empty() {
            issues.push(ValidationIssue::new(
                TAXONOMY,
                vec!["parent".into()],
                "concept ids must not be empty",
            ));
        }
        if parent.trim().is_empty() {
            issues.push(ValidationIssue::new(
                TAXONOMY,
                vec!["parent".into(), child.clone()],
                "parent id must not be empty",
            ));
        }
    }
    if let Some(cycle) = TaxonomyIndex::from_taxonomy(taxonomy).find_cycle() {
        issues.push(ValidationIssue::new(
            TAXONOMY,
            vec!["parent".into(), cycle[0].clone()],
            format!("cycle: {}", cycle.join(" -> ")),
        ));
    }
    issues
}

// ---------------------------------------------------------------------------
// Parsing raw documents
// ---------------------------------------------------------------------------

/// Deserialize each element of a JSON array, collecting per-index failures.
fn parse_array<T: DeserializeOwned>(
    file: &str,
    value: &Value,
) -> (Vec<(usize, T)>, Vec<ValidationIssue>) {
    let Some(items) = value.as_array() else {
        return (
            Vec::new(),
            vec![ValidationIssue::new(file, Vec::new(), "expected an array")],
        );
    };
    let mut parsed = Vec::with_capacity(items.len());
    let mut issues = Vec::new();
    for (index, item) in items.iter().enumerate() {
        match T::deserialize(item) {
            Ok(record) => parsed.push((index, record)),
            Err(e) => issues.push(ValidationIssue::new(file, at(index, None), e.to_string())),
        }
    }
    (parsed, issues)
}

fn facts_from_value(value: &Value) -> (Vec<(usize, Fact)>, Vec<ValidationIssue>) {
    let (parsed, mut issues) = parse_array::<Fact>(FACTS, value);
    issues.extend(check_facts(parsed.iter().map(|(i, f)| (*i, f))));
    (parsed, issues)
}

fn rules_from_value(value: &Value) -> (Vec<(usize, Rule)>, Vec<ValidationIssue>) {
    let (parsed, mut issues) = parse_array::<Rule>(RULES, value);
    issues.extend(check_rules(parsed.iter().map(|(i, r)| (*i, r))));
    (parsed, issues)
}

fn taxonomy_from_value(value: &Value) -> Result<Taxonomy, Vec<ValidationIssue>> {
    let taxonomy = Taxonomy::deserialize(value)
        .map_err(|e| vec![ValidationIssue::new(TAXONOMY, Vec::new(), e.to_string())])?;
    let issues = validate_taxonomy(&taxonomy);
    if issues.is_empty() { Ok(taxonomy) } else { Err(issues) }
}

fn parse_json(file: &str, text: &str) -> KbResult<Value> {
    serde_json::from_str(text).map_err(|e| KbError::Parse {
        file: file.to_string(),
        message: e.to_string(),
    })
}

fn strip_indices<T>(
    file: &str,
    parsed: Vec<(usize, T)>,
    issues: Vec<ValidationIssue>,
) -> KbResult<Vec<T>> {
    if issues.is_empty() {
        Ok(parsed.into_iter().map(|(_, record)| record).collect())
    } else {
        Err(KbError::Validation {
            file: file.to_string(),
            issues,
        })
    }
}

/// Parse and validate the contents of `facts.json`.
pub fn parse_facts(text: &str) -> KbResult<Vec<Fact>> {
    let value = parse_json(FACTS, text)?;
    let (parsed, issues) = facts_from_value(&value);
    strip_indices(FACTS, parsed, issues)
}

/// Parse and validate the contents of `rules.json`.
pub fn parse_rules(text: &str) -> KbResult<Vec<Rule>> {
    let value = parse_json(RULES, text)?;
    let (parsed, issues) = rules_from_value(&value);
    strip_indices(RULES, parsed, issues)
}

/// Parse and validate the contents of `taxonomy.json`.
///
/// A cycle is reported as [`KbError::TaxonomyCycle`], the same error a
/// [`KnowledgeBase`](super::KnowledgeBase) build gives.
pub fn parse_taxonomy(text: &str) -> KbResult<Taxonomy> {
    let value = parse_json(TAXONOMY, text)?;
    let invalid = |issues| KbError::Validation {
        file: TAXONOMY.to_string(),
        issues,
    };
    let taxonomy = Taxonomy::deserialize(&value)
        .map_err(|e| invalid(vec![ValidationIssue::new(TAXONOMY, Vec::new(), e.to_string())]))?;
    if let Some(cycle) = TaxonomyIndex::from_taxonomy(&taxonomy).find_cycle() {
        return Err(KbError::TaxonomyCycle { cycle });
    }
    let issues = validate_taxonomy(&taxonomy);
    if issues.is_empty() { Ok(taxonomy) } else { Err(invalid(issues)) }
}

// ---------------------------------------------------------------------------
// Ad-hoc payload validation
// ---------------------------------------------------------------------------

/// Outcome of [`validate_payload`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<ValidationIssue>,
}

/// Validate a `{ "facts": [...], "rules": [...], "taxonomy": {...} }` payload.
///
/// Every key is optional; absent keys are not checked. Nothing is loaded or
/// stored, this only reports what would be rejected.
pub fn validate_payload(payload: &Value) -> ValidationReport {
    let mut errors = Vec::new();
    if let Some(facts) = payload.get(FACTS) {
        errors.extend(facts_from_value(facts).1);
    }
    if let Some(rules) = payload.get(RULES) {
        errors.extend(rules_from_value(rules).1);
    }
    if let Some(taxonomy) = payload.get(TAXONOMY) {
        if let Err(issues) = taxonomy_from_value(taxonomy) {
            errors.extend(issues);
        }
    }
    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}

/// Where a document handed to [`validate_files`] comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentPath {
    /// Named by the caller. A missing file is reported as an issue.
    Given(PathBuf),
    /// Data-directory default. A missing file is skipped.
    Default(PathBuf),
}

impl DocumentPath {
    pub fn path(&self) -> &Path {
        match self {
            Self::Given(path) | Self::Default(path) => path,
        }
    }
}

/// Read documents from disk and validate them with [`validate_payload`].
///
/// `documents` pairs a payload key (`facts`, `rules` or `taxonomy`) with its
/// location. Unreadable files and malformed JSON become issues under that key.
pub fn validate_files(documents: &[(&str, DocumentPath)]) -> ValidationReport {
    let mut payload = Map::new();
    let mut errors = Vec::new();

    for (key, source) in documents {
        let path = source.path();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if let DocumentPath::Given(_) = source {
                    errors.push(ValidationIssue::new(
                        *key,
                        Vec::new(),
                        format!("file not found: {}", path.display()),
                    ));
                }
                continue;
            }
            Err(e) => {
                errors.push(ValidationIssue::new(
                    *key,
                    Vec::new(),
                    format!("failed to read {}: {e}", path.display()),
                ));
                continue;
            }
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(value) => {
                payload.insert(key.to_string(), value);
            }
            Err(e) => errors.push(ValidationIssue::new(
                *key,
                Vec::new(),
                format!("invalid JSON in {}: {e}", path.display()),
            )),
        }
    }

    let report = validate_payload(&Value::Object(payload));
    errors.extend(report.errors);
    ValidationReport {
        valid: errors.is_empty(),
        errors,
    }
}
