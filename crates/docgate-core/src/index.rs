//! # Schema Index
//!
//! The `(kind, apiVersion)` identity that routes a document to its schema.
//!
//! `apiVersion` is opaque but may encode a composite `group/version`; the
//! group accessors split it on `/`. Versions with more than one separator
//! are malformed and both accessors return the same sentinel, detectable
//! with `starts_with(INVALID_GROUP_PREFIX)`.
//!
//! ## Duplicate identity keys
//!
//! Before decoding, [`parse_index`] scans the raw text for more than one
//! line starting with `apiVersion:` or `kind:`. A permissive decoder would
//! silently keep the last occurrence, so such documents are rejected up
//! front. The scan is line-anchored: occurrences inside comments, values,
//! or nested mappings are ignored.

use std::fmt;
use std::io::Read;
use std::sync::OnceLock;

use regex::bytes::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ValidationError;

/// Prefix of the sentinel returned by [`SchemaIndex::group`] and
/// [`SchemaIndex::group_version`] for malformed versions.
pub const INVALID_GROUP_PREFIX: &str = "invalid:";

/// Identity of a document: its `kind` and `apiVersion`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaIndex {
    #[serde(default, deserialize_with = "null_as_empty")]
    kind: String,
    #[serde(rename = "apiVersion", default, deserialize_with = "null_as_empty")]
    version: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl SchemaIndex {
    /// Build an index from its parts.
    pub fn new(kind: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            version: version.into(),
        }
    }

    /// The document kind.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The full `apiVersion` string.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Replace the version, e.g. after a fallback lookup.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = version.into();
    }

    /// An index is complete when both kind and version are non-empty.
    pub fn is_complete(&self) -> bool {
        !self.kind.is_empty() && !self.version.is_empty()
    }

    /// Group part of the version (`example.io` for `example.io/v1`).
    ///
    /// Empty when the version carries no group.
    pub fn group(&self) -> String {
        self.group_and_group_version().0
    }

    /// Version part of a composite version (`v1` for `example.io/v1`).
    pub fn group_version(&self) -> String {
        self.group_and_group_version().1
    }

    /// Split the version into `(group, group_version)`.
    ///
    /// - no separator: `("", version)`
    /// - one separator: split at it
    /// - more: both outputs are `"invalid: <version>"`
    pub fn group_and_group_version(&self) -> (String, String) {
        let v = self.version.as_str();
        if v.is_empty() {
            return (String::new(), String::new());
        }

        match v.matches('/').count() {
            0 => (String::new(), v.to_string()),
            1 => match v.split_once('/') {
                Some((group, version)) => (group.to_string(), version.to_string()),
                None => (String::new(), v.to_string()),
            },
            _ => {
                let invalid = format!("{INVALID_GROUP_PREFIX} {v}");
                (invalid.clone(), invalid)
            }
        }
    }
}

impl fmt::Display for SchemaIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.kind, self.version)
    }
}

/// Options for [`parse_index`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseIndexOptions {
    /// Accept documents without `kind` or `apiVersion`.
    pub skip_completeness_check: bool,
    /// Keep the document text out of the incompleteness error.
    pub omit_doc_in_error: bool,
}

impl ParseIndexOptions {
    /// Accept documents without identity (pass-through resources).
    pub fn without_completeness_check(mut self) -> Self {
        self.skip_completeness_check = true;
        self
    }

    /// Keep the document text out of error messages.
    pub fn omit_document(mut self) -> Self {
        self.omit_doc_in_error = true;
        self
    }
}

/// Parse the index of a raw document.
///
/// # Errors
///
/// - [`ValidationError::DuplicateKey`] when `apiVersion` or `kind` starts
///   more than one line.
/// - [`ValidationError::InvalidEncoding`] when the document is not a mapping.
/// - [`ValidationError::IncompleteIndex`] when either field is empty, unless
///   the completeness check is disabled.
pub fn parse_index(
    content: &[u8],
    options: &ParseIndexOptions,
) -> Result<SchemaIndex, ValidationError> {
    check_duplicate_identity_keys(content)?;

    let index = if content.iter().all(u8::is_ascii_whitespace) {
        SchemaIndex::default()
    } else {
        serde_yaml::from_slice::<SchemaIndex>(content)
            .map_err(|e| ValidationError::encoding("schema index unmarshal failed", e))?
    };

    if !options.skip_completeness_check && !index.is_complete() {
        return Err(ValidationError::IncompleteIndex {
            index,
            document: (!options.omit_doc_in_error)
                .then(|| String::from_utf8_lossy(content).into_owned()),
        });
    }

    Ok(index)
}

/// Read a whole document from `reader` and parse its index.
///
/// # Errors
///
/// [`ValidationError::Read`] if the reader fails, otherwise as [`parse_index`].
pub fn read_index(
    mut reader: impl Read,
    options: &ParseIndexOptions,
) -> Result<SchemaIndex, ValidationError> {
    let mut content = Vec::new();
    reader.read_to_end(&mut content)?;
    parse_index(&content, options)
}

fn api_version_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^apiVersion:.*$").expect("static pattern compiles"))
}

fn kind_line() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^kind:.*$").expect("static pattern compiles"))
}

fn check_duplicate_identity_keys(content: &[u8]) -> Result<(), ValidationError> {
    for (key, re) in [("apiVersion", api_version_line()), ("kind", kind_line())] {
        let lines: Vec<String> = re
            .find_iter(content)
            .map(|m| String::from_utf8_lossy(m.as_bytes()).trim_end().to_string())
            .collect();
        if lines.len() > 1 {
            return Err(ValidationError::DuplicateKey { key, lines });
        }
    }
    Ok(())
}
