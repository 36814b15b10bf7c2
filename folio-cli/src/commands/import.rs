//! Import command implementation

use super::spinner;
use anyhow::{Context, Result};
use clap::Args;
use folio_core::pipeline::import_markdown;
use folio_core::ImportOptions;
use std::path::PathBuf;

/// Parse and validate a heading level (1-6)
fn parse_level(s: &str) -> Result<u8, String> {
    let n: u8 = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
    if (1..=6).contains(&n) {
        Ok(n)
    } else {
        Err("heading level must be between 1 and 6".to_string())
    }
}

#[derive(Args)]
pub struct ImportArgs {
    /// Markdown file, index.md, or a directory holding index.md
    input: PathBuf,

    /// Output EPUB file (defaults to <input stem>.epub)
    output: Option<PathBuf>,

    /// Book title (overrides the header block)
    #[arg(long)]
    title: Option<String>,

    /// Book author (overrides the header block)
    #[arg(long)]
    author: Option<String>,

    /// Book description (overrides the header block)
    #[arg(long)]
    description: Option<String>,

    /// Language tag (overrides the header block)
    #[arg(long)]
    language: Option<String>,

    /// Heading level that starts a new chapter (default: top-most present)
    #[arg(long, value_parser = parse_level)]
    chapter_level: Option<u8>,
}

/// Convert Markdown to an EPUB
pub fn import(args: ImportArgs) -> Result<()> {
    let options = ImportOptions {
        title: args.title,
        author: args.author,
        description: args.description,
        language: args.language,
        chapter_level: args.chapter_level,
    };
    options.validate().context("Invalid import options")?;

    let output = args
        .output
        .unwrap_or_else(|| args.input.with_extension("epub"));

    let pb = spinner()?;
    pb.set_message("Importing Markdown...");
    let book = import_markdown(&args.input, &output, &options)
        .with_context(|| format!("Failed to import {}", args.input.display()))?;

    tracing::info!(
        "Imported '{}' with {} chapters",
        book.metadata.title,
        book.chapters.len()
    );
    pb.finish_with_message(format!(
        "Imported '{}' -> {}",
        book.metadata.title,
        output.display()
    ));

    Ok(())
}
