//! Rich diagnostic error types for cf-expert.
//!
//! The inference engine itself is total and never fails. Everything that can
//! go wrong happens at the edges: loading and validating the knowledge base,
//! reading and writing the data directory, and reading configuration. Each of
//! those edges has its own error type with miette `#[diagnostic]` derives so
//! the CLI can tell users exactly what is malformed and how to fix it.

use std::fmt;

use miette::Diagnostic;
use serde::Serialize;
use thiserror::Error;

/// Top-level error type for cf-expert.
///
/// Each variant wraps a subsystem-specific error, preserving the full
/// diagnostic chain (codes, help text) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum CfxError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Kb(#[from] KbError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Validation issues
// ---------------------------------------------------------------------------

/// One structural problem found in a facts, rules, or taxonomy document.
///
/// `path` locates the offending value inside the document, e.g.
/// `["3", "conditions", "0"]` for the first condition of the fourth rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub file: String,
    #[serde(rename = "error")]
    pub message: String,
    pub path: Vec<String>,
}

impl ValidationIssue {
    pub fn new(file: impl Into<String>, path: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            message: message.into(),
            path,
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}: {}", self.file, self.message)
        } else {
            write!(f, "{}/{}: {}", self.file, self.path.join("/"), self.message)
        }
    }
}

fn render_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|i| i.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

// ---------------------------------------------------------------------------
// Knowledge base errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum KbError {
    #[error("failed to parse {file}: {message}")]
    #[diagnostic(
        code(cfx::kb::parse),
        help(
            "The document is not valid JSON or does not have the expected shape. \
             Facts need `id`, `description`, `value`; rules need `id`, `conditions`, \
             `conclusion`; unknown fields are rejected."
        )
    )]
    Parse { file: String, message: String },

    #[error("{file} failed validation: {}", render_issues(.issues))]
    #[diagnostic(
        code(cfx::kb::validation),
        help(
            "Fix the listed fields and reload. Ids must be non-empty and unique, \
             rules need at least one condition, and certainty must lie in [0, 1]."
        )
    )]
    Validation {
        file: String,
        issues: Vec<ValidationIssue>,
    },

    #[error("taxonomy contains a cycle: {}", .cycle.join(" -> "))]
    #[diagnostic(
        code(cfx::kb::taxonomy_cycle),
        help(
            "Every concept must reach a root by following `parent` links. \
             Remove one of the listed parent entries to break the cycle."
        )
    )]
    TaxonomyCycle { cycle: Vec<String> },

    #[error("{kind} \"{id}\" not found")]
    #[diagnostic(
        code(cfx::kb::not_found),
        help("List the knowledge base with `cfx info` and check the id.")
    )]
    NotFound { kind: &'static str, id: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    #[diagnostic(
        code(cfx::store::io),
        help(
            "A filesystem operation failed. Check that the data directory exists \
             and has correct permissions."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("required file not found: {path}")]
    #[diagnostic(
        code(cfx::store::missing_file),
        help(
            "The data directory must contain facts.json, rules.json and taxonomy.json. \
             Run `cfx init` to create an empty one."
        )
    )]
    MissingFile { path: String },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(cfx::store::serde),
        help("Failed to serialize the knowledge base. This is a bug; please report it.")
    )]
    Serialization { message: String },

    #[error("failed to replace {path}: {message}")]
    #[diagnostic(
        code(cfx::store::persist),
        help(
            "The new file was written to a temporary location but could not be moved \
             into place. The previous version is still intact."
        )
    )]
    Persist { path: String, message: String },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(cfx::config::read),
        help("Ensure the config file exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(cfx::config::parse),
        help("Check the TOML syntax. Unknown keys are rejected.")
    )]
    Parse { path: String, message: String },
}

pub type KbResult<T> = std::result::Result<T, KbError>;
pub type StoreResult<T> = std::result::Result<T, StoreError>;
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Convenience alias for functions returning cf-expert results.
pub type CfxResult<T> = std::result::Result<T, CfxError>;
