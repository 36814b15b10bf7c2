//! Decoders for converting input formats to the IR

mod epub;
mod front_matter;
mod markdown;
mod normalize;
mod split;

pub use epub::EpubDecoder;
pub use front_matter::{parse_front_matter, render_front_matter, split_front_matter, FrontMatter};
pub use markdown::{parse_markdown, MarkdownDecoder};
pub use normalize::{document_title, first_heading, image_references, NormalizedDocument, Normalizer};
pub use split::{split_sections, top_heading_level, Section};

use crate::error::Result;
use crate::types::Book;
use std::io::Read;

/// Trait for decoding book formats into the IR
pub trait Decoder {
    /// Decode a book from a reader
    fn decode(&self, reader: &mut dyn Read) -> Result<Book>;
}

/// File extensions read as Markdown
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdown", "mkd"];
