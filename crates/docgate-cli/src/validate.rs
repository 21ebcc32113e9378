//! # Validate Subcommand
//!
//! `docgate validate --schema <file>... <documents.yaml>`
//!
//! Splits the stream, validates every non-blank document and prints the
//! defaulted documents separated by `---`. Failures are collected into one
//! [`BatchReport`] printed to stderr.
//!
//! With `--pass-through`, documents without a registered schema and
//! documents without `kind`/`apiVersion` are emitted unchanged.

use std::fs::File;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use docgate_core::{parse_index, read_documents, BatchReport, DocumentError, ParseIndexOptions};
use docgate_schema::{ValidateOptions, Validator};

use crate::load_validator;

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Schema definition file; repeat for several.
    #[arg(long = "schema", short = 's', required = true)]
    pub schemas: Vec<PathBuf>,

    /// Validator configuration file.
    #[arg(long, env = "DOCGATE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Reject repeated keys and undeclared top-level fields.
    #[arg(long)]
    pub strict: bool,

    /// Keep document text out of error messages.
    #[arg(long)]
    pub omit_doc: bool,

    /// One-line error messages.
    #[arg(long)]
    pub compact: bool,

    /// Emit documents without a schema or identity unchanged instead of failing.
    #[arg(long)]
    pub pass_through: bool,

    /// YAML document stream; `-` reads stdin.
    pub document: PathBuf,
}

impl ValidateArgs {
    /// Validation switches selected on the command line.
    pub fn options(&self) -> ValidateOptions {
        ValidateOptions {
            omit_doc_in_error: self.omit_doc,
            strict_decode: self.strict,
            no_pretty_error: self.compact,
        }
    }
}

/// Result of validating a document stream.
#[derive(Debug, Default)]
pub struct StreamOutcome {
    /// Validated (or passed-through) documents, in stream order.
    pub documents: Vec<String>,
    /// Failures, one entry per rejected document.
    pub report: BatchReport,
}

impl StreamOutcome {
    /// Documents joined into one stream.
    pub fn render(&self) -> String {
        self.documents.join("\n---\n")
    }
}

/// Validate every non-blank document of `documents`.
pub fn validate_documents(
    validator: &Validator,
    documents: Vec<String>,
    options: ValidateOptions,
    pass_through: bool,
) -> StreamOutcome {
    let mut outcome = StreamOutcome::default();

    let documents = documents.into_iter().filter(|d| !d.trim().is_empty());
    for (position, document) in documents.enumerate() {
        if pass_through && lacks_identity(&document) {
            tracing::debug!(position, "no kind or apiVersion, passing document through");
            outcome.documents.push(document);
            continue;
        }

        let mut buffer = document.clone().into_bytes();
        match validator.validate(&mut buffer, options) {
            Ok(index) => {
                tracing::debug!(position, %index, "document valid");
                outcome
                    .documents
                    .push(String::from_utf8_lossy(&buffer).into_owned());
            }
            Err(e) if pass_through && e.is_schema_not_found() => {
                tracing::debug!(position, "no schema, passing document through");
                outcome.documents.push(document);
            }
            Err(e) => {
                outcome.report.append(
                    e.kind(),
                    DocumentError::for_document(Some(position), document.as_bytes(), vec![e.to_string()]),
                );
            }
        }
    }

    outcome
}

/// True when the document parses but names no `kind` or `apiVersion`.
fn lacks_identity(document: &str) -> bool {
    let options = ParseIndexOptions::default().without_completeness_check();
    matches!(parse_index(document.as_bytes(), &options), Ok(index) if !index.is_complete())
}

/// Run the subcommand; returns true when every document passed.
pub fn run(args: &ValidateArgs) -> anyhow::Result<bool> {
    let validator = load_validator(&args.schemas, args.config.as_deref())?;

    let documents = if args.document.as_os_str() == "-" {
        read_documents(std::io::stdin().lock()).context("read documents from stdin")?
    } else {
        let file = File::open(&args.document)
            .with_context(|| format!("open document file {}", args.document.display()))?;
        read_documents(file).with_context(|| format!("read document file {}", args.document.display()))?
    };

    let outcome = validate_documents(&validator, documents, args.options(), args.pass_through);
    if !outcome.documents.is_empty() {
        println!("{}", outcome.render());
    }

    match outcome.report.into_result() {
        Ok(()) => Ok(true),
        Err(report) => {
            eprintln!("{report}");
            Ok(false)
        }
    }
}
