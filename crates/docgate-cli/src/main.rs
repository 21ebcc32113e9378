//! # docgate CLI Entry Point
//!
//! Assembles subcommands and dispatches to handler modules.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

/// docgate: schema-indexed document validation.
///
/// Validates YAML documents against the schema registered for their
/// `kind` and `apiVersion`, applying schema defaults on success.
#[derive(Parser, Debug)]
#[command(name = "docgate", version, about)]
struct Cli {
    /// Log at debug level regardless of RUST_LOG.
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Validate a document stream.
    Validate(docgate_cli::validate::ValidateArgs),
    /// List loaded schemas.
    Schemas(docgate_cli::schemas::SchemasArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match &cli.command {
        Commands::Validate(args) => docgate_cli::validate::run(args),
        Commands::Schemas(args) => docgate_cli::schemas::run(args).map(|()| true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(docgate_cli::EXIT_INVALID),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(docgate_cli::EXIT_FATAL)
        }
    }
}
