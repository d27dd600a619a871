//! CLI configuration, persisted as TOML.
//!
//! ```toml
//! data_dir = "data"
//! facts_file = "facts.json"
//! rules_file = "rules.json"
//! taxonomy_file = "taxonomy.json"
//! use_true_facts = false
//! ```
//!
//! Every key is optional.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::kb::DataFiles;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CfxConfig {
    /// Directory holding the knowledge-base documents.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_facts_file")]
    pub facts_file: String,
    #[serde(default = "default_rules_file")]
    pub rules_file: String,
    #[serde(default = "default_taxonomy_file")]
    pub taxonomy_file: String,
    /// Default for `useTrueFacts` when a request does not say.
    #[serde(default)]
    pub use_true_facts: bool,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_facts_file() -> String {
    "facts.json".into()
}
fn default_rules_file() -> String {
    "rules.json".into()
}
fn default_taxonomy_file() -> String {
    "taxonomy.json".into()
}

impl Default for CfxConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            facts_file: default_facts_file(),
            rules_file: default_rules_file(),
            taxonomy_file: default_taxonomy_file(),
            use_true_facts: false,
        }
    }
}

impl CfxConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content).map_err(|message| ConfigError::Parse {
            path: path.display().to_string(),
            message,
        })
    }

    fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Resolve document paths relative to `data_dir`.
    pub fn data_files(&self) -> DataFiles {
        DataFiles {
            facts: self.data_dir.join(&self.facts_file),
            rules: self.data_dir.join(&self.rules_file),
            taxonomy: self.data_dir.join(&self.taxonomy_file),
            dir: self.data_dir.clone(),
        }
    }
}
