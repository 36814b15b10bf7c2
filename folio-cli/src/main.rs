//! Folio CLI - convert EPUB packages to Markdown and back

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{ExportArgs, ImportArgs};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export an EPUB to Markdown
    Export(ExportArgs),

    /// Import Markdown into an EPUB
    Import(ImportArgs),

    /// Display information about an EPUB or Markdown book
    Info {
        /// Input file path
        input: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so `info --json` output stays clean
    let filter = if cli.verbose {
        "folio_cli=debug,folio_core=debug"
    } else {
        "folio_cli=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Export(args) => commands::export(args),
        Commands::Import(args) => commands::import(args),
        Commands::Info { input, json } => commands::info(&input, json),
    }
}
