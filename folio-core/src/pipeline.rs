//! End-to-end conversions between files on disk

use crate::config::{ExportOptions, ImportOptions};
use crate::decoder::{Decoder, EpubDecoder, MarkdownDecoder, MARKDOWN_EXTENSIONS};
use crate::encoder::{EpubEncoder, ExportBundle, MarkdownEncoder};
use crate::error::{FolioError, Result};
use crate::types::Book;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Decode an EPUB file and render it as Markdown.
///
/// `single_name` is the document name used in single mode.
pub fn export_epub(input: &Path, options: &ExportOptions, single_name: &str) -> Result<ExportBundle> {
    options.validate()?;
    let book = read_epub(input, options)?;
    let encoder = MarkdownEncoder::new(options.clone()).with_file_name(single_name);
    Ok(encoder.render(book))
}

/// Decode an EPUB file into a book
pub fn read_epub(input: &Path, options: &ExportOptions) -> Result<Book> {
    let stem = file_stem(input);
    let mut file = File::open(input)?;
    EpubDecoder::new(options.clone())
        .with_fallback_title(stem)
        .decode(&mut file)
}

/// Decode a Markdown file, index file or directory into a book
pub fn read_markdown(input: &Path, options: &ImportOptions) -> Result<Book> {
    MarkdownDecoder::new(options.clone()).decode_path(input)
}

/// Decode an EPUB file, a Markdown file or a directory holding `index.md`,
/// picking the decoder from the path
pub fn read_book(input: &Path) -> Result<Book> {
    if input.is_dir() {
        return read_markdown(input, &ImportOptions::default());
    }

    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    match ext.as_str() {
        "epub" => read_epub(input, &ExportOptions::default()),
        e if MARKDOWN_EXTENSIONS.contains(&e) => read_markdown(input, &ImportOptions::default()),
        "" => Err(FolioError::UnsupportedInput(format!(
            "{} (no file extension)",
            input.display()
        ))),
        other => Err(FolioError::UnsupportedInput(format!(".{other} files"))),
    }
}

/// Import Markdown and write it as an EPUB package at `output`
pub fn import_markdown(input: &Path, output: &Path, options: &ImportOptions) -> Result<Book> {
    let book = read_markdown(input, options)?;
    write_epub(&book, output)?;
    Ok(book)
}

/// Write `book` as an EPUB package at `output`
pub fn write_epub(book: &Book, output: &Path) -> Result<()> {
    create_parent(output)?;
    let file = BufWriter::new(File::create(output)?);
    let mut writer = EpubEncoder::new().write_package(book, file)?;
    std::io::Write::flush(&mut writer)?;
    info!("Wrote {}", output.display());
    Ok(())
}

/// Write every document and asset of a bundle under `dir`.
///
/// Returns the written paths in order: documents first, then assets.
pub fn write_bundle(bundle: &ExportBundle, dir: &Path) -> Result<Vec<PathBuf>> {
    let mut written = Vec::with_capacity(bundle.documents.len() + bundle.assets.len());

    for doc in &bundle.documents {
        let path = join_relative(dir, &doc.path)?;
        create_parent(&path)?;
        fs::write(&path, &doc.contents)?;
        debug!("Wrote {}", path.display());
        written.push(path);
    }

    for asset in &bundle.assets {
        let path = join_relative(dir, &asset.output_path)?;
        create_parent(&path)?;
        fs::write(&path, &asset.data)?;
        debug!("Wrote {} ({} bytes)", path.display(), asset.data.len());
        written.push(path);
    }

    info!(
        "Wrote {} documents and {} assets to {}",
        bundle.documents.len(),
        bundle.assets.len(),
        dir.display()
    );
    Ok(written)
}

fn join_relative(dir: &Path, relative: &str) -> Result<PathBuf> {
    let mut path = dir.to_path_buf();
    for segment in relative.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                return Err(FolioError::InvalidOption(format!(
                    "output path '{relative}' leaves the output directory"
                )))
            }
            s => path.push(s),
        }
    }
    Ok(path)
}

fn create_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("Untitled")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::OutputDocument;
    use crate::types::Asset;
    use tempfile::tempdir;

    #[test]
    fn test_write_bundle() {
        let dir = tempdir().unwrap();
        let bundle = ExportBundle {
            documents: vec![OutputDocument {
                path: "index.md".into(),
                contents: "# Book\n".into(),
            }],
            assets: vec![Asset::new("OEBPS/a.png", "images/a.png", "image/png", vec![1, 2, 3])],
        };

        let written = write_bundle(&bundle, dir.path()).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(dir.path().join("index.md")).unwrap(), "# Book\n");
        assert_eq!(fs::read(dir.path().join("images/a.png")).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_read_book_picks_the_decoder() {
        let dir = tempdir().unwrap();
        let markdown = dir.path().join("notes.markdown");
        fs::write(&markdown, "# One\n\nBody\n").unwrap();
        let book = read_book(&markdown).unwrap();
        assert_eq!(book.title(), "notes");
        assert_eq!(book.chapters.len(), 1);

        let epub = dir.path().join("notes.epub");
        write_epub(&book, &epub).unwrap();
        assert_eq!(read_book(&epub).unwrap().chapters[0].title, "One");

        let text = dir.path().join("notes.txt");
        fs::write(&text, "plain").unwrap();
        let err = read_book(&text).unwrap_err();
        assert!(matches!(err, FolioError::UnsupportedInput(_)));
        assert_eq!(err.to_string(), "No decoder available for .txt files");
    }

    #[test]
    fn test_write_bundle_rejects_escaping_paths() {
        let dir = tempdir().unwrap();
        let bundle = ExportBundle {
            documents: vec![OutputDocument {
                path: "../outside.md".into(),
                contents: String::new(),
            }],
            assets: Vec::new(),
        };
        assert!(matches!(
            write_bundle(&bundle, dir.path()),
            Err(FolioError::InvalidOption(_))
        ));
    }
}
