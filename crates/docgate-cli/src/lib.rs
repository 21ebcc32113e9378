//! # docgate-cli: docgate Command-Line Interface
//!
//! Validates YAML document streams against schema definition files.
//!
//! ## Subcommands
//!
//! - `validate`: validate every document of a stream, print the defaulted
//!   documents, report failures per document
//! - `schemas`: list loaded schema indices, optionally auditing open
//!   object shapes
//!
//! ## Crate Policy
//!
//! - CLI construction (argument parsing) is separated from business logic.
//! - Handler functions delegate to `docgate-schema`; no validation logic here.
//! - Documents go to stdout; reports and logs go to stderr.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::Context;
use docgate_schema::{read_schemas, Validator, ValidatorConfig};

pub mod schemas;
pub mod validate;

/// Exit status when at least one document failed validation.
pub const EXIT_INVALID: u8 = 1;

/// Exit status for configuration and I/O failures.
pub const EXIT_FATAL: u8 = 2;

/// Build a validator from an optional configuration file and a set of
/// schema definition files.
pub fn load_validator(schema_files: &[PathBuf], config: Option<&Path>) -> anyhow::Result<Validator> {
    let config = match config {
        Some(path) => ValidatorConfig::from_path(path)?,
        None => ValidatorConfig::default(),
    };
    let mut validator = Validator::new(config);

    for path in schema_files {
        let file = File::open(path).with_context(|| format!("open schema file {}", path.display()))?;
        let loaded = read_schemas(file).with_context(|| format!("load schema file {}", path.display()))?;
        for schema in loaded {
            tracing::debug!(index = %schema.index, file = %path.display(), "loaded schema");
            validator.add_schema(schema.index, schema.schema);
        }
    }

    Ok(validator)
}
