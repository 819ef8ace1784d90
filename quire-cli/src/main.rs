//! # quire CLI
//!
//! Command-line interface for the quire document translator.

mod commands;

use clap::{Parser, Subcommand};
use quire_types::Backend;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "quire.yml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Translate every markdown file under the source directory
    Build {
        /// Output backend (html, materialize, latex); overrides the config
        #[arg(long)]
        backend: Option<Backend>,

        /// Render threads; 0 uses the available parallelism
        #[arg(long)]
        workers: Option<usize>,

        /// Print the build summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Tokenize one file and report its diagnostics
    Check {
        /// Markdown file to tokenize
        file: PathBuf,

        /// Print the AST
        #[arg(long)]
        ast: bool,
    },

    /// List each grammar's patterns in precedence order
    Grammar,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(if cli.verbose {
                tracing::Level::DEBUG.into()
            } else {
                tracing::Level::INFO.into()
            }),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Build {
            backend,
            workers,
            json,
        } => commands::build_documents(
            &cli.config,
            commands::BuildOptions {
                backend,
                workers,
                json,
            },
        ),
        Commands::Check { file, ast } => commands::check_file(&cli.config, &file, ast),
        Commands::Grammar => commands::show_grammar(&cli.config),
    }
}
