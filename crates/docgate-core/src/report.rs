//! # Batch Reports
//!
//! Aggregates per-document failures of a multi-document stream into one
//! error. Each entry names the document by its position in the stream, its
//! `group/version, Kind=kind` identity and its `metadata.name` when present.
//! The report's kind is the most severe [`ErrorKind`] appended.

use std::fmt;

use serde::Deserialize;

use crate::error::ErrorKind;
use crate::index::SchemaIndex;

#[derive(Debug, Clone, Default, Deserialize)]
struct Metadata {
    #[serde(default)]
    name: Option<String>,
}

/// Document identity extended with `metadata.name`, for reporting only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedIndex {
    #[serde(default)]
    kind: Option<String>,
    #[serde(rename = "apiVersion", default)]
    version: Option<String>,
    #[serde(default)]
    metadata: Option<Metadata>,
}

impl NamedIndex {
    /// Best-effort parse; undecodable documents yield an empty identity.
    pub fn parse(content: &[u8]) -> Self {
        serde_yaml::from_slice(content).unwrap_or_default()
    }

    /// The `(kind, apiVersion)` part.
    pub fn index(&self) -> SchemaIndex {
        SchemaIndex::new(
            self.kind.clone().unwrap_or_default(),
            self.version.clone().unwrap_or_default(),
        )
    }

    /// `metadata.name`, empty when absent.
    pub fn name(&self) -> &str {
        self.metadata
            .as_ref()
            .and_then(|m| m.name.as_deref())
            .unwrap_or_default()
    }

    /// Both kind and version are present.
    pub fn is_complete(&self) -> bool {
        self.index().is_complete()
    }
}

impl fmt::Display for NamedIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())?;
        if !self.name().is_empty() {
            write!(f, ", metadata.name: {:?}", self.name())?;
        }
        Ok(())
    }
}

/// Failure report for one document of a stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentError {
    /// Position of the document in its stream.
    pub position: Option<usize>,
    /// API group, empty for ungrouped versions.
    pub group: String,
    /// Version within the group.
    pub version: String,
    /// Document kind.
    pub kind: String,
    /// `metadata.name`, when present.
    pub name: String,
    /// Failure messages.
    pub messages: Vec<String>,
}

impl DocumentError {
    /// Build an entry for `content`, identifying it from its own fields.
    pub fn for_document(position: Option<usize>, content: &[u8], messages: Vec<String>) -> Self {
        let named = NamedIndex::parse(content);
        let index = named.index();
        let (group, version) = index.group_and_group_version();
        Self {
            position,
            group,
            version,
            kind: index.kind().to_string(),
            name: named.name().to_string(),
            messages,
        }
    }
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut header = String::new();
        if let Some(position) = self.position {
            header.push_str(&format!("[{position}]"));
        }
        if !self.group.is_empty() {
            header.push_str(&format!("{}/{}, Kind={}", self.group, self.version, self.kind));
        } else if !self.version.is_empty() {
            header.push_str(&format!("{}, Kind={}", self.version, self.kind));
        }
        if !self.name.is_empty() {
            header.push_str(&format!(" {:?}", self.name));
        }
        if !header.is_empty() {
            write!(f, "{header}: ")?;
        }
        f.write_str(&self.messages.join("; "))
    }
}

/// Aggregated failures of a document stream.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    kind: Option<ErrorKind>,
    errors: Vec<DocumentError>,
}

impl BatchReport {
    /// An empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure, raising the report's kind if `kind` is more severe.
    pub fn append(&mut self, kind: ErrorKind, error: DocumentError) {
        if self.kind.map_or(true, |current| current < kind) {
            self.kind = Some(kind);
        }
        self.errors.push(error);
    }

    /// Most severe kind appended so far.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.kind
    }

    /// All recorded failures, in append order.
    pub fn errors(&self) -> &[DocumentError] {
        &self.errors
    }

    /// Returns true when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// `Ok(())` when empty, the report otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for BatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "{kind}: ")?,
            None => f.write_str("unknown: ")?,
        }
        for (i, e) in self.errors.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for BatchReport {}
