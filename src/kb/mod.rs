//! Knowledge base: validated, immutable snapshots of facts, rules and taxonomy.
//!
//! A [`KnowledgeBase`] is built once from records that passed validation and
//! is never mutated afterwards. Edits go through [`store::KnowledgeStore`],
//! which builds a fresh snapshot and swaps it in; inferences already running
//! keep the snapshot they started with.

pub mod model;
pub mod store;
pub mod validate;

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::{KbError, KbResult};
use crate::taxonomy::TaxonomyIndex;

pub use model::{Fact, Rule, Taxonomy};
pub use store::{DataFiles, KnowledgeStore};
pub use validate::{DocumentPath, ValidationReport, validate_files, validate_payload};

/// Counts describing a snapshot, for `cfx info` and health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KbSummary {
    pub facts: usize,
    pub baseline_true: usize,
    pub rules: usize,
    pub taxonomy_edges: usize,
}

/// An immutable, validated knowledge-base snapshot.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    facts: Vec<Fact>,
    rules: Vec<Rule>,
    taxonomy: Taxonomy,
    index: TaxonomyIndex,
    baseline_true: BTreeSet<String>,
}

impl KnowledgeBase {
    /// Validate the records and build a snapshot.
    ///
    /// A cyclic taxonomy is reported as [`KbError::TaxonomyCycle`]; any other
    /// problem as [`KbError::Validation`] listing every issue in that document.
    pub fn new(facts: Vec<Fact>, rules: Vec<Rule>, taxonomy: Taxonomy) -> KbResult<Self> {
        let index = TaxonomyIndex::from_taxonomy(&taxonomy);
        if let Some(cycle) = index.find_cycle() {
            return Err(KbError::TaxonomyCycle { cycle });
        }

        for (file, issues) in [
            (validate::FACTS, validate::validate_facts(&facts)),
            (validate::RULES, validate::validate_rules(&rules)),
            (validate::TAXONOMY, validate::validate_taxonomy(&taxonomy)),
        ] {
            if !issues.is_empty() {
                return Err(KbError::Validation {
                    file: file.to_string(),
                    issues,
                });
            }
        }

        let baseline_true = facts
            .iter()
            .filter(|f| f.value)
            .map(|f| f.id.clone())
            .collect();

        Ok(Self {
            facts,
            rules,
            taxonomy,
            index,
            baseline_true,
        })
    }

    /// An empty knowledge base: no facts, no rules, no taxonomy.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn taxonomy(&self) -> &Taxonomy {
        &self.taxonomy
    }

    pub fn taxonomy_index(&self) -> &TaxonomyIndex {
        &self.index
    }

    pub fn fact(&self, id: &str) -> Option<&Fact> {
        self.facts.iter().find(|f| f.id == id)
    }

    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Ids of facts whose baseline value is `true`, in lexical order.
    pub fn baseline_true(&self) -> &BTreeSet<String> {
        &self.baseline_true
    }

    pub fn summary(&self) -> KbSummary {
        KbSummary {
            facts: self.facts.len(),
            baseline_true: self.baseline_true.len(),
            rules: self.rules.len(),
            taxonomy_edges: self.index.len(),
        }
    }
}
