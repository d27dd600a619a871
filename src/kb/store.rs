//! Copy-on-write knowledge store backed by a data directory.
//!
//! The store owns the current [`KnowledgeBase`] snapshot. Readers take an
//! `Arc` to it and never block writers for longer than a pointer swap. Writers
//! are serialized: each edit builds a complete new snapshot, validates it,
//! writes the changed document to disk (temp file + rename), and only then
//! swaps the snapshot. A rejected edit leaves disk and memory untouched.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;

use crate::error::{CfxResult, KbError, StoreError, StoreResult};
use crate::infer::InferEngine;

use super::model::{Fact, Rule, Taxonomy};
use super::validate::{parse_facts, parse_rules, parse_taxonomy};
use super::KnowledgeBase;

/// Locations of the three knowledge-base documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFiles {
    pub dir: PathBuf,
    pub facts: PathBuf,
    pub rules: PathBuf,
    pub taxonomy: PathBuf,
}

impl DataFiles {
    /// Standard layout: `facts.json`, `rules.json`, `taxonomy.json` in `dir`.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            facts: dir.join("facts.json"),
            rules: dir.join("rules.json"),
            taxonomy: dir.join("taxonomy.json"),
            dir,
        }
    }
}

fn read_document(path: &Path) -> StoreResult<String> {
    if !path.exists() {
        return Err(StoreError::MissingFile {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Write `value` as pretty JSON, replacing `path` atomically.
fn write_document<T: Serialize + ?Sized>(path: &Path, value: &T) -> StoreResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let io_err = |source| StoreError::Io {
        path: path.display().to_string(),
        source,
    };

    let mut tmp = tempfile::Builder::new()
        .prefix("._")
        .suffix(".json")
        .tempfile_in(dir)
        .map_err(io_err)?;
    serde_json::to_writer_pretty(&mut tmp, value).map_err(|e| StoreError::Serialization {
        message: e.to_string(),
    })?;
    tmp.write_all(b"\n").map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| StoreError::Persist {
        path: path.display().to_string(),
        message: e.error.to_string(),
    })?;
    Ok(())
}

/// Which documents an edit touched.
#[derive(Debug, Clone, Copy)]
enum Changed {
    Facts,
    Rules,
    Taxonomy,
}

/// Owner of the current knowledge-base snapshot.
pub struct KnowledgeStore {
    files: DataFiles,
    current: RwLock<Arc<KnowledgeBase>>,
    writer: Mutex<()>,
}

impl KnowledgeStore {
    /// Create an empty data directory. Existing documents are left alone.
    pub fn init(files: &DataFiles) -> StoreResult<()> {
        std::fs::create_dir_all(&files.dir).map_err(|source| StoreError::Io {
            path: files.dir.display().to_string(),
            source,
        })?;
        if !files.facts.exists() {
            write_document(&files.facts, &Vec::<Fact>::new())?;
        }
        if !files.rules.exists() {
            write_document(&files.rules, &Vec::<Rule>::new())?;
        }
        if !files.taxonomy.exists() {
            write_document(&files.taxonomy, &Taxonomy::default())?;
        }
        Ok(())
    }

    /// Load and validate all three documents.
    pub fn open(files: &DataFiles) -> CfxResult<Self> {
        let facts = parse_facts(&read_document(&files.facts)?)?;
        let rules = parse_rules(&read_document(&files.rules)?)?;
        let taxonomy = parse_taxonomy(&read_document(&files.taxonomy)?)?;
        let kb = KnowledgeBase::new(facts, rules, taxonomy)?;

        let summary = kb.summary();
        tracing::info!(
            dir = %files.dir.display(),
            facts = summary.facts,
            rules = summary.rules,
            taxonomy_edges = summary.taxonomy_edges,
            "knowledge base loaded"
        );

        Ok(Self::with_snapshot(files.clone(), kb))
    }

    /// Wrap an already-built snapshot. Nothing is read from disk.
    pub fn with_snapshot(files: DataFiles, kb: KnowledgeBase) -> Self {
        Self {
            files,
            current: RwLock::new(Arc::new(kb)),
            writer: Mutex::new(()),
        }
    }

    pub fn files(&self) -> &DataFiles {
        &self.files
    }

    /// The current snapshot. Later edits do not affect the returned value.
    pub fn snapshot(&self) -> Arc<KnowledgeBase> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// An inference engine bound to the current snapshot.
    pub fn engine(&self) -> InferEngine {
        InferEngine::new(self.snapshot())
    }

    // -----------------------------------------------------------------------
    // Edits
    // -----------------------------------------------------------------------

    /// Insert a fact or replace the one with the same id.
    /// Returns `true` when an existing fact was replaced.
    pub fn upsert_fact(&self, fact: Fact) -> CfxResult<bool> {
        self.edit(Changed::Facts, |facts, _, _| {
            Ok(match facts.iter_mut().find(|f| f.id == fact.id) {
                Some(existing) => {
                    *existing = fact;
                    true
                }
                None => {
                    facts.push(fact);
                    false
                }
            })
        })
    }

    pub fn remove_fact(&self, id: &str) -> CfxResult<()> {
        self.edit(Changed::Facts, |facts, _, _| {
            let before = facts.len();
            facts.retain(|f| f.id != id);
            if facts.len() == before {
                return Err(KbError::NotFound {
                    kind: "fact",
                    id: id.to_string(),
                });
            }
            Ok(())
        })
    }

    /// Insert a rule or replace the one with the same id.
    /// Returns `true` when an existing rule was replaced.
    pub fn upsert_rule(&self, rule: Rule) -> CfxResult<bool> {
        self.edit(Changed::Rules, |_, rules, _| {
            Ok(match rules.iter_mut().find(|r| r.id == rule.id) {
                Some(existing) => {
                    *existing = rule;
                    true
                }
                None => {
                    rules.push(rule);
                    false
                }
            })
        })
    }

    pub fn remove_rule(&self, id: &str) -> CfxResult<()> {
        self.edit(Changed::Rules, |_, rules, _| {
            let before = rules.len();
            rules.retain(|r| r.id != id);
            if rules.len() == before {
                return Err(KbError::NotFound {
                    kind: "rule",
                    id: id.to_string(),
                });
            }
            Ok(())
        })
    }

    pub fn replace_taxonomy(&self, taxonomy: Taxonomy) -> CfxResult<()> {
        self.edit(Changed::Taxonomy, |_, _, current| {
            *current = taxonomy;
            Ok(())
        })
    }

    /// Set (`Some`) or clear (`None`) the parent of one concept.
    pub fn set_parent(&self, child: &str, parent: Option<&str>) -> CfxResult<()> {
        self.edit(Changed::Taxonomy, |_, _, taxonomy| {
            match parent {
                Some(p) => {
                    taxonomy.parent.insert(child.to_string(), p.to_string());
                }
                None => {
                    if taxonomy.parent.remove(child).is_none() {
                        return Err(KbError::NotFound {
                            kind: "taxonomy entry",
                            id: child.to_string(),
                        });
                    }
                }
            }
            Ok(())
        })
    }

    /// Apply `change` to copies of the current records, then validate,
    /// persist and swap.
    fn edit<T>(
        &self,
        changed: Changed,
        change: impl FnOnce(&mut Vec<Fact>, &mut Vec<Rule>, &mut Taxonomy) -> Result<T, KbError>,
    ) -> CfxResult<T> {
        let _guard = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let base = self.snapshot();

        let mut facts = base.facts().to_vec();
        let mut rules = base.rules().to_vec();
        let mut taxonomy = base.taxonomy().clone();
        let out = change(&mut facts, &mut rules, &mut taxonomy)?;

        let next = KnowledgeBase::new(facts, rules, taxonomy)?;
        match changed {
            Changed::Facts => write_document(&self.files.facts, next.facts())?,
            Changed::Rules => write_document(&self.files.rules, next.rules())?,
            Changed::Taxonomy => write_document(&self.files.taxonomy, next.taxonomy())?,
        }

        let summary = next.summary();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(next);
        tracing::info!(
            ?changed,
            facts = summary.facts,
            rules = summary.rules,
            taxonomy_edges = summary.taxonomy_edges,
            "knowledge base snapshot swapped"
        );
        Ok(out)
    }
}
