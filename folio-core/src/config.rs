//! Run configuration for export and import
//!
//! Both option sets are plain values built once per run (usually by the CLI)
//! and passed by reference to every stage that needs them.

use crate::error::{FolioError, Result};
use serde::{Deserialize, Serialize};

/// Default chapter file prefix
pub const DEFAULT_PREFIX: &str = "chapter";

/// Default subdirectory for extracted assets
pub const DEFAULT_IMAGE_DIR: &str = "images";

/// Default language tag when neither overrides nor a header give one
pub const DEFAULT_LANGUAGE: &str = "en";

/// Whether export writes one file per chapter or a single document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// One concatenated document
    #[default]
    Single,
    /// One file per chapter plus an index
    Split,
}

/// Options for EPUB → Markdown export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub mode: OutputMode,

    /// Chapter file prefix; empty drops the `<prefix>-` part
    pub prefix: String,

    /// Subdirectory (relative to the output) for assets
    pub image_dir: String,

    /// Relocate images into `image_dir`; when off, targets pass through verbatim
    pub extract_images: bool,

    /// Prepend the cover image to the index (split) or the document (single)
    pub cover_banner: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            mode: OutputMode::Single,
            prefix: DEFAULT_PREFIX.to_string(),
            image_dir: DEFAULT_IMAGE_DIR.to_string(),
            extract_images: true,
            cover_banner: true,
        }
    }
}

impl ExportOptions {
    /// Split-mode options with everything else at defaults
    pub fn split() -> Self {
        Self {
            mode: OutputMode::Split,
            ..Self::default()
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_image_dir(mut self, dir: impl Into<String>) -> Self {
        self.image_dir = dir.into();
        self
    }

    pub fn with_cover_banner(mut self, on: bool) -> Self {
        self.cover_banner = on;
        self
    }

    pub fn with_extract_images(mut self, on: bool) -> Self {
        self.extract_images = on;
        self
    }

    pub fn is_split(&self) -> bool {
        self.mode == OutputMode::Split
    }

    /// Reject values the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        validate_relative_dir("image directory", &self.image_dir)?;
        if self.prefix.contains(['/', '\\']) {
            return Err(FolioError::InvalidOption(format!(
                "prefix '{}' must not contain a path separator",
                self.prefix
            )));
        }
        Ok(())
    }
}

/// Options for Markdown → EPUB import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Overrides the header block and the file-stem default
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub language: Option<String>,

    /// Boundary heading level; `None` picks the top-most level present
    pub chapter_level: Option<u8>,
}

impl ImportOptions {
    /// Reject values the pipeline cannot honor
    pub fn validate(&self) -> Result<()> {
        if let Some(level) = self.chapter_level {
            if !(1..=6).contains(&level) {
                return Err(FolioError::InvalidOption(format!(
                    "chapter level must be between 1 and 6, got {level}"
                )));
            }
        }
        if let Some(lang) = &self.language {
            if lang.trim().is_empty() {
                return Err(FolioError::InvalidOption(
                    "language must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

fn validate_relative_dir(what: &str, dir: &str) -> Result<()> {
    let trimmed = dir.trim_matches('/');
    if trimmed.is_empty() {
        return Err(FolioError::InvalidOption(format!("{what} must not be empty")));
    }
    if dir.starts_with('/') || dir.contains('\\') {
        return Err(FolioError::InvalidOption(format!(
            "{what} '{dir}' must be a relative path"
        )));
    }
    if trimmed.split('/').any(|seg| seg == ".." || seg.is_empty()) {
        return Err(FolioError::InvalidOption(format!(
            "{what} '{dir}' must stay inside the output directory"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_defaults() {
        let opts = ExportOptions::default();
        assert_eq!(opts.prefix, "chapter");
        assert_eq!(opts.image_dir, "images");
        assert!(opts.extract_images);
        assert!(opts.cover_banner);
        assert!(!opts.is_split());
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_export_rejects_bad_image_dir() {
        for dir in ["", "/abs", "../up", "a/../../b", "a//b"] {
            let opts = ExportOptions::default().with_image_dir(dir);
            assert!(opts.validate().is_err(), "{dir} should be rejected");
        }
        assert!(ExportOptions::default()
            .with_image_dir("assets/img")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_empty_prefix_is_allowed() {
        assert!(ExportOptions::split().with_prefix("").validate().is_ok());
        assert!(ExportOptions::split().with_prefix("a/b").validate().is_err());
    }

    #[test]
    fn test_import_chapter_level_range() {
        let mut opts = ImportOptions::default();
        assert!(opts.validate().is_ok());
        opts.chapter_level = Some(0);
        assert!(opts.validate().is_err());
        opts.chapter_level = Some(7);
        assert!(opts.validate().is_err());
        opts.chapter_level = Some(2);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn test_options_deserialize_with_defaults() {
        let opts: ExportOptions = serde_json::from_str(r#"{"mode":"split"}"#).unwrap();
        assert!(opts.is_split());
        assert_eq!(opts.prefix, "chapter");
    }
}
