//! EPUB container reading: archive, package document, reading order

mod archive;
mod opf;
mod resolver;

pub use archive::{EpubArchive, CONTAINER_PATH};
pub use opf::{ManifestItem, Package, PackageMetadata, SpineEntry};
pub use resolver::{resolve_reading_order, ContentDocument};
