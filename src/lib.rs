// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # cf-expert
//!
//! A forward-chaining, certainty-factor inference engine over a concept
//! taxonomy.
//!
//! ## Architecture
//!
//! - **Taxonomy index** (`taxonomy`): child → parent lookup, cycle-guarded ancestor walks
//! - **Inference** (`infer`): confidence propagation, rule evaluation, ranking
//! - **Knowledge base** (`kb`): validated immutable snapshots and a copy-on-write store
//! - **Request boundary** (`request`): lenient parsing of JSON and query-string requests
//!
//! ## Library usage
//!
//! ```
//! use std::sync::Arc;
//!
//! use cf_expert::infer::{InferEngine, InferenceQuery};
//! use cf_expert::kb::{KnowledgeBase, Rule, Taxonomy};
//!
//! let kb = KnowledgeBase::new(
//!     Vec::new(),
//!     vec![Rule::new("r1", ["respiratory"], "flu").with_certainty(0.8)],
//!     Taxonomy::new([("cough", "respiratory")]),
//! )
//! .unwrap();
//!
//! let engine = InferEngine::new(Arc::new(kb));
//! let result = engine.infer(&InferenceQuery::new().observe("cough"));
//! assert_eq!(result.ranked_conclusions[0].conclusion, "flu");
//! assert_eq!(result.ranked_conclusions[0].score, 0.8);
//! ```

pub mod confidence;
pub mod config;
pub mod error;
pub mod infer;
pub mod kb;
pub mod request;
pub mod taxonomy;
