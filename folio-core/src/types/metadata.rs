//! Book metadata types (Dublin Core subset)

use serde::{Deserialize, Serialize};

/// Book metadata following the Dublin Core fields an EPUB package carries
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    /// Book title
    pub title: String,

    /// Authors/creators
    pub creator: Vec<String>,

    /// Book description/summary
    pub description: Option<String>,

    /// Language tag (BCP 47)
    pub language: String,

    /// Package identifier
    pub identifier: String,
}

impl Metadata {
    /// Create new metadata with required fields
    pub fn new(title: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            creator: Vec::new(),
            description: None,
            language: language.into(),
            identifier: format!("urn:uuid:{}", uuid::Uuid::new_v4()),
        }
    }

    /// Add an author/creator
    pub fn with_creator(mut self, creator: impl Into<String>) -> Self {
        self.creator.push(creator.into());
        self
    }

    /// Set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
