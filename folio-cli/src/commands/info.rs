//! Info command implementation

use anyhow::{Context, Result};
use folio_core::pipeline::read_book;
use folio_core::Book;
use serde::Serialize;
use std::path::Path;

/// Book info output
#[derive(Serialize)]
struct BookInfo {
    title: String,
    authors: Vec<String>,
    language: String,
    description: Option<String>,
    chapters: Vec<String>,
    assets: usize,
    cover: Option<String>,
}

impl From<&Book> for BookInfo {
    fn from(book: &Book) -> Self {
        Self {
            title: book.metadata.title.clone(),
            authors: book.metadata.creator.clone(),
            language: book.metadata.language.clone(),
            description: book.metadata.description.clone(),
            chapters: book.chapters.iter().map(|c| c.title.clone()).collect(),
            assets: book.assets.len(),
            cover: book.cover().map(|c| c.output_path.clone()),
        }
    }
}

/// Display information about a book
pub fn info(input: &Path, json: bool) -> Result<()> {
    let book = read_book(input).with_context(|| format!("Failed to decode {}", input.display()))?;
    let info = BookInfo::from(&book);

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("Title:       {}", info.title);
        if !info.authors.is_empty() {
            println!("Authors:     {}", info.authors.join(", "));
        }
        println!("Language:    {}", info.language);
        if let Some(desc) = &info.description {
            println!("Description: {}", desc);
        }
        println!("Chapters:    {}", info.chapters.len());
        for (i, title) in info.chapters.iter().enumerate() {
            println!("  {:>3}. {}", i + 1, title);
        }
        println!("Assets:      {}", info.assets);
        if let Some(cover) = &info.cover {
            println!("Cover:       {}", cover);
        }
    }

    Ok(())
}
