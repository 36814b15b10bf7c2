//! Intermediate representation for chapter bodies

use serde::{Deserialize, Serialize};

/// One element of a chapter body.
///
/// The set is closed: every input format is reduced to these variants and
/// every output format is produced from them. Link and image targets hold
/// output-relative paths once a chapter has been normalized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Node {
    /// A run of text, whitespace already collapsed
    Text(String),

    /// Heading (levels 1-6)
    Heading { level: u8, text: String },

    /// End of a paragraph or other block
    ParagraphBreak,

    /// Hard line break inside a block
    LineBreak,

    /// Hyperlink
    Link { target: String, label: String },

    /// Image reference
    Image { target: String, alt: String },

    /// Explicit break between sections
    SectionBreak,
}

impl Node {
    /// Create a text node
    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(s.into())
    }

    /// Create a heading, clamping the level to 1..=6
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Node::Heading {
            level: level.clamp(1, 6),
            text: text.into(),
        }
    }

    /// Create a link node
    pub fn link(target: impl Into<String>, label: impl Into<String>) -> Self {
        Node::Link {
            target: target.into(),
            label: label.into(),
        }
    }

    /// Create an image node
    pub fn image(target: impl Into<String>, alt: impl Into<String>) -> Self {
        Node::Image {
            target: target.into(),
            alt: alt.into(),
        }
    }

    /// Whether this node starts or ends a block rather than carrying content
    pub fn is_break(&self) -> bool {
        matches!(
            self,
            Node::ParagraphBreak | Node::LineBreak | Node::SectionBreak
        )
    }

    /// Whether this node carries something a reader would see
    pub fn has_content(&self) -> bool {
        match self {
            Node::Text(s) => !s.trim().is_empty(),
            Node::ParagraphBreak | Node::LineBreak | Node::SectionBreak => false,
            _ => true,
        }
    }
}

/// Concatenate the visible text of a node sequence
pub fn plain_text(nodes: &[Node]) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            Node::Text(s) => out.push_str(s),
            Node::Heading { text, .. } => out.push_str(text),
            Node::Link { label, .. } => out.push_str(label),
            Node::Image { alt, .. } => out.push_str(alt),
            Node::ParagraphBreak | Node::LineBreak | Node::SectionBreak => out.push(' '),
        }
    }
    collapse_whitespace(&out)
}

/// Collapse every whitespace run to a single space and trim the ends
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Append a text run, merging with a preceding text node
pub(crate) fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Node::Text(prev)) = nodes.last_mut() {
        prev.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_string()));
    }
}

/// Append a paragraph break unless the sequence is empty or already broken
pub(crate) fn push_paragraph_break(nodes: &mut Vec<Node>) {
    match nodes.last() {
        None | Some(Node::ParagraphBreak) | Some(Node::SectionBreak) => {}
        Some(Node::Heading { .. }) => {}
        Some(Node::LineBreak) => {
            nodes.pop();
            push_paragraph_break(nodes);
        }
        Some(_) => nodes.push(Node::ParagraphBreak),
    }
}
