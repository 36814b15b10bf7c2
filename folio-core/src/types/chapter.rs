//! Chapter type representing a single chapter/section of a book

use super::Node;
use serde::{Deserialize, Serialize};

/// A single chapter of a book
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chapter {
    /// Stable identifier (manifest id on export, generated on import)
    pub id: String,

    /// Display title
    pub title: String,

    /// Level of the heading that opened this chapter (import only)
    pub level: Option<u8>,

    /// 0-based position in reading order
    pub ordinal: usize,

    /// Output file name, `<prefix>-<NN>-<slug>.<ext>`
    pub file_name: String,

    /// The body content
    pub content: Vec<Node>,
}

impl Chapter {
    /// Create a new chapter with a title and its position
    pub fn new(title: impl Into<String>, ordinal: usize) -> Self {
        Self {
            id: format!("chapter-{:03}", ordinal + 1),
            title: title.into(),
            level: None,
            ordinal,
            file_name: String::new(),
            content: Vec::new(),
        }
    }

    /// Set the chapter ID
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the output file name
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Add content nodes
    pub fn with_content(mut self, content: Vec<Node>) -> Self {
        self.content = content;
        self
    }

    /// Whether the body contains any heading
    pub fn has_heading(&self) -> bool {
        self.content
            .iter()
            .any(|n| matches!(n, Node::Heading { .. }))
    }

    /// Iterate over every image target in the body
    pub fn image_targets(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|n| match n {
            Node::Image { target, .. } => Some(target.as_str()),
            _ => None,
        })
    }
}
