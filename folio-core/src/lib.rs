//! Folio Core Library
//!
//! Converts EPUB packages to Markdown (one document or one file per chapter)
//! and Markdown back to EPUB 3. Both directions go through the same
//! intermediate representation: a [`Book`] of [`Chapter`]s holding a flat
//! [`Node`] sequence, plus the [`Asset`]s those nodes reference.

pub mod assets;
pub mod config;
pub mod container;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod href;
pub mod media;
pub mod naming;
pub mod pipeline;
pub mod types;

pub use config::{ExportOptions, ImportOptions, OutputMode};
pub use error::{
    AssetReadError, FolioError, MetadataParseError, PackageWriteError, Result, StructureError,
    UnresolvedReferenceError,
};
pub use types::{Asset, Book, Chapter, Metadata, Node};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_creation() {
        let book = Book::new("Test Book", "en");
        assert_eq!(book.metadata.title, "Test Book");
        assert_eq!(book.metadata.language, "en");
    }
}
