//! Core types for the Folio intermediate representation (IR)

mod asset;
mod book;
mod chapter;
mod metadata;
mod node;

pub use asset::Asset;
pub use book::Book;
pub use chapter::Chapter;
pub use metadata::Metadata;
pub use node::{collapse_whitespace, plain_text, Node};
pub(crate) use node::{push_paragraph_break, push_text};
