//! # Schemas Subcommand
//!
//! `docgate schemas --schema <file>... [--audit]`
//!
//! Lists the indices the given definition files register. With `--audit`,
//! every node that still accepts undeclared fields is listed under
//! its index.

use std::path::PathBuf;

use clap::Args;
use docgate_schema::{audit_open_shapes, Validator};

use crate::load_validator;

/// Arguments for the schemas subcommand.
#[derive(Args, Debug)]
pub struct SchemasArgs {
    /// Schema definition file; repeat for several.
    #[arg(long = "schema", short = 's', required = true)]
    pub schemas: Vec<PathBuf>,

    /// Report open object shapes.
    #[arg(long)]
    pub audit: bool,
}

/// One line per index, followed by its findings when auditing.
pub fn render(validator: &Validator, audit: bool) -> String {
    let mut out = String::new();
    for index in validator.schema_indices() {
        out.push_str(&format!("{index}\n"));
        if !audit {
            continue;
        }
        if let Some(schema) = validator.get(index) {
            for finding in audit_open_shapes(&schema) {
                out.push_str(&format!("  {finding}\n"));
            }
        }
    }
    out
}

/// Run the subcommand.
pub fn run(args: &SchemasArgs) -> anyhow::Result<()> {
    let validator = load_validator(&args.schemas, None)?;
    print!("{}", render(&validator, args.audit));
    Ok(())
}
