//! # docgate-core: Foundational Types for docgate
//!
//! This crate is the leaf of the docgate workspace. It defines the document
//! identity, the error taxonomy every other crate reports through, and the
//! YAML stream helpers used to get from raw bytes to a generic value tree.
//!
//! ## Key Design Principles
//!
//! 1. **One identity type.** [`SchemaIndex`] is the `(kind, apiVersion)` pair
//!    used as the key of every registry. It is parsed from raw bytes by
//!    [`parse_index`], which refuses documents carrying duplicate identity keys.
//!
//! 2. **Kinds, not strings.** Every failure is a [`ValidationError`] whose
//!    [`ErrorKind`] is introspectable, so callers can tell "no schema for this
//!    document" apart from "this document is broken" without matching text.
//!
//! 3. **Input bytes are read-only.** Nothing in this crate mutates the input
//!    buffer; encoding helpers always produce fresh bytes.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `docgate-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests; `.expect()` only on static
//!   regex patterns.

pub mod document;
pub mod error;
pub mod index;
pub mod path;
pub mod report;

// Re-export primary types for ergonomic imports.
pub use document::{
    decode_value, encode_value, read_documents, split_documents, yaml_to_json_value, DecodeMode,
};
pub use error::{
    BoxError, ErrorKind, FailureContext, RuleViolation, ValidationError, ValidationViolations,
    Violation,
};
pub use index::{parse_index, read_index, ParseIndexOptions, SchemaIndex, INVALID_GROUP_PREFIX};
pub use path::{FieldPath, PathSegment};
pub use report::{BatchReport, DocumentError, NamedIndex};
