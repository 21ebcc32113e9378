//! # Validator Configuration
//!
//! Serializable setup for a [`Validator`](crate::Validator): version
//! fallbacks and transformer selection.
//!
//! ```yaml
//! versionFallbacks:
//!   example.io/v1beta1: example.io/v1
//! defaultTransformers: [closeUnset]
//! transformers:
//!   - kind: AnotherKind
//!     apiVersion: test
//!     use: [closeAll]
//! ```
//!
//! Fallbacks from the file are merged over the built-in `v1alpha1 -> v1`
//! entry. Unknown keys are rejected.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use docgate_core::SchemaIndex;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::transformer::TransformerKind;

/// Errors raised while reading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("read config {}: {source}", .path.display())]
    Read {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The file is not a valid configuration.
    #[error("decode config: {0}")]
    Decode(#[from] serde_yaml::Error),
}

/// Version fallbacks every validator starts with.
pub fn default_version_fallbacks() -> BTreeMap<String, String> {
    BTreeMap::from([("v1alpha1".to_string(), "v1".to_string())])
}

fn merge_with_default_fallbacks<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let mut fallbacks = default_version_fallbacks();
    fallbacks.extend(BTreeMap::<String, String>::deserialize(deserializer)?);
    Ok(fallbacks)
}

/// Transformers for one index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexTransformers {
    /// Document kind.
    pub kind: String,
    /// Document version.
    #[serde(rename = "apiVersion")]
    pub version: String,
    /// Transformers applied, in order.
    #[serde(rename = "use", default)]
    pub transformers: Vec<TransformerKind>,
}

impl IndexTransformers {
    /// The index these transformers are registered under.
    pub fn index(&self) -> SchemaIndex {
        SchemaIndex::new(self.kind.clone(), self.version.clone())
    }
}

/// Setup handed to [`Validator::new`](crate::Validator::new).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ValidatorConfig {
    /// One-hop version remapping consulted when a direct lookup misses.
    #[serde(
        default = "default_version_fallbacks",
        deserialize_with = "merge_with_default_fallbacks"
    )]
    pub version_fallbacks: BTreeMap<String, String>,

    /// Transformers for indices without their own list.
    #[serde(default)]
    pub default_transformers: Vec<TransformerKind>,

    /// Per-index transformer lists.
    #[serde(default)]
    pub transformers: Vec<IndexTransformers>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            version_fallbacks: default_version_fallbacks(),
            default_transformers: Vec::new(),
            transformers: Vec::new(),
        }
    }
}

impl ValidatorConfig {
    /// Decode a configuration document. A blank document yields the default.
    pub fn from_yaml(content: &[u8]) -> Result<Self, ConfigError> {
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_slice(content)?)
    }

    /// Read and decode a configuration file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }
}
