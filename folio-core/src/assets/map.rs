//! Original-path → output-path rewrite map

use std::collections::HashMap;

/// Collects rewrite entries while assets and documents are being planned.
///
/// Call [`RewriteMapBuilder::finish`] to obtain the read-only [`RewriteMap`]
/// consumed during normalization.
#[derive(Debug, Default)]
pub struct RewriteMapBuilder {
    entries: HashMap<String, String>,
}

impl RewriteMapBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a source path to its output target.
    ///
    /// The first mapping for a source path is kept; later ones are ignored
    /// and `false` is returned.
    pub fn insert(&mut self, source: impl Into<String>, target: impl Into<String>) -> bool {
        let source = source.into();
        if self.entries.contains_key(&source) {
            return false;
        }
        self.entries.insert(source, target.into());
        true
    }

    pub fn finish(self) -> RewriteMap {
        RewriteMap {
            entries: self.entries,
        }
    }
}

/// Finalized, immutable rewrite map
#[derive(Debug, Clone, Default)]
pub struct RewriteMap {
    entries: HashMap<String, String>,
}

impl RewriteMap {
    /// Output target for a source path
    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries.get(source).map(String::as_str)
    }
}
