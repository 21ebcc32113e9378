//! # Field Paths
//!
//! Location of a data fragment inside a document, accumulated while the
//! extension rule engine walks schema and data together. Renders as
//! `spec.keys[0].passphrase`.

use std::fmt;

/// One step of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object property by name.
    Field(String),
    /// Array element by position.
    Index(usize),
}

/// Path from the document root to a fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The document root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Returns true at the document root.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Descend one level.
    pub fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    /// Ascend one level.
    pub fn pop(&mut self) -> Option<PathSegment> {
        self.0.pop()
    }

    /// The segments from root to leaf.
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Field(name) if i == 0 => f.write_str(name)?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
                PathSegment::Index(idx) => write!(f, "[{idx}]")?,
            }
        }
        Ok(())
    }
}
