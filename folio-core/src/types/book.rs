//! The main Book type - the root of the IR

use super::{Asset, Chapter, Metadata};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The complete book representation.
///
/// Both directions of conversion go through this type: the EPUB and
/// Markdown decoders produce it, the encoders consume it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Book {
    /// Book metadata (title, author, etc.)
    pub metadata: Metadata,

    /// Chapters in reading order
    pub chapters: Vec<Chapter>,

    /// Assets in emission order (cover first when present)
    pub assets: Vec<Asset>,
}

impl Book {
    /// Create a new book with the given title and language
    pub fn new(title: impl Into<String>, language: impl Into<String>) -> Self {
        Self::with_metadata(Metadata::new(title, language))
    }

    /// Create a book with existing metadata
    pub fn with_metadata(metadata: Metadata) -> Self {
        Self {
            metadata,
            chapters: Vec::new(),
            assets: Vec::new(),
        }
    }

    /// Add a chapter to the book
    pub fn add_chapter(&mut self, chapter: Chapter) {
        self.chapters.push(chapter);
    }

    /// Get the book title
    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    /// The cover asset, if one was detected
    pub fn cover(&self) -> Option<&Asset> {
        self.assets.iter().find(|a| a.is_cover)
    }

    /// Check the structural invariants the encoders rely on.
    ///
    /// Returns a description of the first violation found.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let mut names = HashSet::new();
        for (i, chapter) in self.chapters.iter().enumerate() {
            if chapter.ordinal != i {
                return Err(format!(
                    "chapter '{}' has ordinal {} at position {}",
                    chapter.title, chapter.ordinal, i
                ));
            }
            if chapter.file_name.is_empty() {
                return Err(format!("chapter '{}' has no file name", chapter.title));
            }
            if !names.insert(chapter.file_name.as_str()) {
                return Err(format!("duplicate chapter file name '{}'", chapter.file_name));
            }
        }

        let mut paths = HashSet::new();
        for asset in &self.assets {
            if !paths.insert(asset.output_path.as_str()) {
                return Err(format!("duplicate asset path '{}'", asset.output_path));
            }
        }

        if self.assets.iter().filter(|a| a.is_cover).count() > 1 {
            return Err("more than one cover asset".to_string());
        }
        Ok(())
    }
}
