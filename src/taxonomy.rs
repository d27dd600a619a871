//! Taxonomy index: child → parent lookup and ancestor walks.
//!
//! A taxonomy is a forest: every concept has at most one parent. When
//! `cough` has parent `respiratory` and `respiratory` has parent `symptom`,
//! the ancestors of `cough` are `respiratory` then `symptom`.
//!
//! Cycles are rejected when a knowledge base is built (see [`find_cycle`]).
//! The ancestor walk still guards against them so a malformed index can only
//! ever produce a short sequence, never a hang.
//!
//! [`find_cycle`]: TaxonomyIndex::find_cycle

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::kb::Taxonomy;

/// Parent lookup built from a taxonomy's `parent` mapping.
#[derive(Debug, Clone, Default)]
pub struct TaxonomyIndex {
    parents: HashMap<String, String>,
}

impl TaxonomyIndex {
    /// Build an index from child → parent pairs.
    pub fn new<I, K, V>(edges: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            parents: edges
                .into_iter()
                .map(|(child, parent)| (child.into(), parent.into()))
                .collect(),
        }
    }

    pub fn from_taxonomy(taxonomy: &Taxonomy) -> Self {
        Self::new(
            taxonomy
                .parent
                .iter()
                .map(|(child, parent)| (child.as_str(), parent.as_str())),
        )
    }

    /// Direct parent of a concept, if it has one.
    pub fn parent_of(&self, concept: &str) -> Option<&str> {
        self.parents.get(concept).map(String::as_str)
    }

    /// True when there are no parent relations at all.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Number of child → parent edges.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Walk the parent chain of `concept`, nearest first, excluding `concept`.
    ///
    /// The walk is lazy and restartable: every call starts a fresh iterator.
    pub fn ancestors<'a>(&'a self, concept: &'a str) -> Ancestors<'a> {
        Ancestors {
            index: self,
            origin: concept,
            current: concept,
            seen: HashSet::from([concept]),
            done: false,
        }
    }

    /// Find a cycle in the parent relation.
    ///
    /// Returns the concepts on the first cycle found, starting and ending with
    /// the same concept (e.g. `["a", "b", "a"]`). Start points are tried in
    /// lexical order so the report is stable across runs.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        let ordered: BTreeMap<&str, &str> = self
            .parents
            .iter()
            .map(|(c, p)| (c.as_str(), p.as_str()))
            .collect();
        let mut acyclic: HashSet<&str> = HashSet::new();

        for &start in ordered.keys() {
            if acyclic.contains(start) {
                continue;
            }
            let mut path: Vec<&str> = vec![start];
            let mut on_path: HashMap<&str, usize> = HashMap::from([(start, 0)]);
            let mut cur = start;

            while let Some(&parent) = ordered.get(cur) {
                if acyclic.contains(parent) {
                    break;
                }
                if let Some(&pos) = on_path.get(parent) {
                    let mut cycle: Vec<String> =
                        path[pos..].iter().map(|s| s.to_string()).collect();
                    cycle.push(parent.to_string());
                    return Some(cycle);
                }
                on_path.insert(parent, path.len());
                path.push(parent);
                cur = parent;
            }
            acyclic.extend(path);
        }
        None
    }
}

/// Lazy ancestor walk returned by [`TaxonomyIndex::ancestors`].
pub struct Ancestors<'a> {
    index: &'a TaxonomyIndex,
    origin: &'a str,
    current: &'a str,
    seen: HashSet<&'a str>,
    done: bool,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let Some(parent) = self.index.parent_of(self.current) else {
            self.done = true;
            return None;
        };
        if !self.seen.insert(parent) {
            tracing::warn!(
                concept = self.origin,
                revisited = parent,
                "taxonomy cycle detected during ancestor walk, stopping"
            );
            self.done = true;
            return None;
        }
        self.current = parent;
        Some(parent)
    }
}
