//! # Error Types: Validation Error Taxonomy
//!
//! Defines the errors reported by every docgate operation. All errors use
//! `thiserror` for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Each variant maps to exactly one [`ErrorKind`]; callers branch on
//!   [`ValidationError::kind`] rather than on message text.
//! - [`ErrorKind::SchemaNotFound`] is a soft condition: a document with no
//!   registered schema may simply not be a managed resource.
//! - Pre-validator errors are caller-defined and are surfaced verbatim.
//! - Structural and extension-rule failures carry a [`FailureContext`] that
//!   renders either the full document or a compact one-line header.

use std::fmt;

use thiserror::Error;

use crate::index::SchemaIndex;
use crate::path::FieldPath;

/// Boxed error returned by caller-supplied hooks (pre-validators, rule handlers).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Classification of a [`ValidationError`].
///
/// Variants are declared in ascending severity, so the derived `Ord` can be
/// used to pick the most severe kind out of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    /// No schema is registered for the document's index.
    SchemaNotFound,
    /// A caller-supplied pre-validator rejected the document.
    PreValidation,
    /// The document was decoded but rejected: duplicate or incomplete
    /// identity, structural violations, or extension-rule violations.
    ValidationFailed,
    /// The document cannot be decoded into the expected shape.
    InvalidEncoding,
    /// The underlying byte source failed.
    Read,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SchemaNotFound => "SchemaNotFound",
            Self::PreValidation => "PreValidation",
            Self::ValidationFailed => "ValidationFailed",
            Self::InvalidEncoding => "InvalidEncoding",
            Self::Read => "Read",
        };
        f.write_str(name)
    }
}

/// Top-level error type for docgate.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// The byte source could not be read.
    #[error("read failed: {0}")]
    Read(#[from] std::io::Error),

    /// The document could not be decoded.
    #[error("invalid encoding: {context}: {reason}")]
    InvalidEncoding {
        /// Which decode step failed.
        context: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// A top-level identity key occurs more than once.
    #[error("validation failed: multiple {key} keys found: {}", .lines.join(" "))]
    DuplicateKey {
        /// `kind` or `apiVersion`.
        key: &'static str,
        /// The matched lines, verbatim.
        lines: Vec<String>,
    },

    /// The document lacks `kind` or `apiVersion`.
    #[error(
        "validation failed: document must contain \"kind\" and \"apiVersion\" fields:\n\tapiVersion: {}\n\tkind: {}{}",
        .index.version(),
        .index.kind(),
        DocumentText(.document.as_deref())
    )]
    IncompleteIndex {
        /// The partial index that was decoded.
        index: SchemaIndex,
        /// Offending document text, unless omitted by options.
        document: Option<String>,
    },

    /// No schema is registered for the index, even after fallback and
    /// pre-validation.
    #[error("schema not found: {index}")]
    SchemaNotFound {
        /// The index after fallback resolution.
        index: SchemaIndex,
    },

    /// A pre-validator rejected the document.
    #[error(transparent)]
    PreValidation(BoxError),

    /// The resolved schema could not be compiled into a structural validator.
    #[error("schema for \"{index}\" cannot be compiled: {reason}")]
    SchemaCompile {
        /// Index of the schema.
        index: SchemaIndex,
        /// Compiler message.
        reason: String,
    },

    /// The document violates its schema.
    #[error("{context}{violations}")]
    Structural {
        /// Document identity and rendering policy.
        context: FailureContext,
        /// Every violation found, not only the first.
        violations: ValidationViolations,
    },

    /// An extension rule rejected part of the document.
    #[error("{context}{violation}")]
    Extension {
        /// Document identity and rendering policy.
        context: FailureContext,
        /// The failing rule.
        #[source]
        violation: RuleViolation,
    },
}

impl ValidationError {
    /// The kind this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Read(_) => ErrorKind::Read,
            Self::InvalidEncoding { .. } => ErrorKind::InvalidEncoding,
            Self::SchemaNotFound { .. } => ErrorKind::SchemaNotFound,
            Self::PreValidation(_) => ErrorKind::PreValidation,
            Self::DuplicateKey { .. }
            | Self::IncompleteIndex { .. }
            | Self::SchemaCompile { .. }
            | Self::Structural { .. }
            | Self::Extension { .. } => ErrorKind::ValidationFailed,
        }
    }

    /// Returns true when the error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind() == kind
    }

    /// Returns true when no schema was found for the document.
    pub fn is_schema_not_found(&self) -> bool {
        self.is(ErrorKind::SchemaNotFound)
    }

    pub(crate) fn encoding(context: &'static str, reason: impl fmt::Display) -> Self {
        Self::InvalidEncoding {
            context,
            reason: reason.to_string(),
        }
    }
}

/// Appends `"\n\n<document>"` when a document is present.
struct DocumentText<'a>(Option<&'a str>);

impl fmt::Display for DocumentText<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(doc) => write!(f, "\n\n{doc}"),
            None => Ok(()),
        }
    }
}

/// Identity and rendering policy attached to a rejected document.
///
/// Renders as the header of a failure message: the full document when it
/// was kept, or a one-line `"<index>" document validation failed: ` prefix.
#[derive(Debug, Clone)]
pub struct FailureContext {
    /// Index the document was validated under.
    pub index: SchemaIndex,
    /// Original document text, when the caller wants it in messages.
    pub document: Option<String>,
}

impl fmt::Display for FailureContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.document {
            Some(doc) => write!(f, "Document validation failed:\n---\n{doc}\n\n"),
            None => write!(f, "\"{}\" document validation failed: ", self.index),
        }
    }
}

/// A single structural violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer path to the violating field in the instance.
    pub instance_path: String,
    /// JSON Pointer path within the schema that triggered the error.
    pub schema_path: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_path.is_empty() {
            write!(f, "(root): {}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_path, self.message)
        }
    }
}

/// Collection of structural violations.
///
/// Renders one violation per line, or all on one line separated by `"; "`
/// when compact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationViolations {
    violations: Vec<Violation>,
    compact: bool,
}

impl ValidationViolations {
    /// Wrap a list of violations.
    pub fn new(violations: Vec<Violation>, compact: bool) -> Self {
        Self {
            violations,
            compact,
        }
    }

    /// Returns the number of violations.
    pub fn len(&self) -> usize {
        self.violations.len()
    }

    /// Returns true if there are no violations.
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    /// Returns a slice of all violations.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Consumes self and returns the inner Vec.
    pub fn into_inner(self) -> Vec<Violation> {
        self.violations
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.compact && self.violations.len() > 1 {
            writeln!(f, "{} errors occurred:", self.violations.len())?;
        }
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                if self.compact {
                    f.write_str("; ")?;
                } else {
                    writeln!(f)?;
                }
            }
            if self.compact || self.violations.len() == 1 {
                write!(f, "{v}")?;
            } else {
                write!(f, "\t* {v}")?;
            }
        }
        Ok(())
    }
}

/// An extension rule rejected a data fragment.
#[derive(Debug)]
pub struct RuleViolation {
    /// Extension attribute that declared the rule (e.g. `x-rules`).
    pub extension: String,
    /// Rule name as written in the schema.
    pub rule: String,
    /// Location of the rejected fragment.
    pub path: FieldPath,
    /// The handler's error.
    pub source: BoxError,
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_root() {
            write!(f, "{}", self.source)
        } else {
            write!(f, "{}: {}", self.path, self.source)
        }
    }
}

impl std::error::Error for RuleViolation {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&*self.source)
    }
}
