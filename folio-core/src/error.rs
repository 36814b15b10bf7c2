//! Error types for Folio Core

use thiserror::Error;

/// Result type alias using FolioError
pub type Result<T> = std::result::Result<T, FolioError>;

/// Top-level error type for all Folio operations
#[derive(Debug, Error)]
pub enum FolioError {
    #[error("Structure error: {0}")]
    Structure(#[from] StructureError),

    #[error(transparent)]
    UnresolvedReference(#[from] UnresolvedReferenceError),

    #[error(transparent)]
    AssetRead(#[from] AssetReadError),

    #[error("Metadata parse error: {0}")]
    MetadataParse(#[from] MetadataParseError),

    #[error("Package write error: {0}")]
    PackageWrite(#[from] PackageWriteError),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("No decoder available for {0}")]
    UnsupportedInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while reading the container, package document or manifest
#[derive(Debug, Error)]
pub enum StructureError {
    #[error("not a valid EPUB archive: {0}")]
    InvalidArchive(String),

    #[error("missing archive entry '{0}'")]
    MissingEntry(String),

    #[error("no package document declared in META-INF/container.xml")]
    NoRootfile,

    #[error("malformed XML in '{path}': {message}")]
    MalformedXml { path: String, message: String },

    #[error("manifest in '{0}' declares no items")]
    EmptyManifest(String),
}

/// A link or image target with no entry in the rewrite map
#[derive(Debug, Error)]
#[error("unresolved reference '{reference}' in {document}")]
pub struct UnresolvedReferenceError {
    /// The target exactly as written in the source markup
    pub reference: String,

    /// The content document that contains it
    pub document: String,
}

/// An asset's bytes could not be loaded
#[derive(Debug, Error)]
#[error("cannot read asset '{path}': {reason}")]
pub struct AssetReadError {
    pub path: String,
    pub reason: String,
}

/// Errors in the leading key-value header block of a Markdown document
#[derive(Debug, Error)]
pub enum MetadataParseError {
    #[error("header block is never closed")]
    Unterminated,

    #[error("invalid header block: {0}")]
    Invalid(String),
}

/// Errors raised while assembling or writing an EPUB package
#[derive(Debug, Error)]
pub enum PackageWriteError {
    #[error("book has no chapters")]
    NoChapters,

    #[error("inconsistent book: {0}")]
    Inconsistent(String),

    #[error("archive error: {0}")]
    Archive(String),

    #[error("XML generation failed: {0}")]
    Xml(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for PackageWriteError {
    fn from(err: zip::result::ZipError) -> Self {
        PackageWriteError::Archive(err.to_string())
    }
}

impl From<quick_xml::Error> for PackageWriteError {
    fn from(err: quick_xml::Error) -> Self {
        PackageWriteError::Xml(err.to_string())
    }
}
