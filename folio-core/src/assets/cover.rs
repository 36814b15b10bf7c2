//! Cover image detection

use crate::media;

/// Path fragments that conventionally mark a cover image
const PATH_PATTERNS: [&str; 4] = ["cover", "couverture", "front", "titlepage"];

/// Id fragments that conventionally mark a cover image
const ID_PATTERNS: [&str; 2] = ["cover", "couverture"];

/// An explicit cover declaration attached to a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CoverMarker {
    /// `<meta name="cover">` in the package, or a `cover:` header key
    Metadata,
    /// The `cover-image` manifest property
    Property,
}

/// A binary resource eligible for relocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetCandidate {
    /// Manifest id (the source path on import)
    pub id: String,
    pub source_path: String,
    pub media_type: String,
    pub cover_marker: Option<CoverMarker>,
}

impl AssetCandidate {
    pub fn new(
        id: impl Into<String>,
        source_path: impl Into<String>,
        media_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            source_path: source_path.into(),
            media_type: media_type.into(),
            cover_marker: None,
        }
    }

    pub fn with_cover_marker(mut self, marker: CoverMarker) -> Self {
        self.cover_marker = Some(marker);
        self
    }

    fn is_image(&self) -> bool {
        media::is_image(&self.media_type)
    }

    fn matches_naming_pattern(&self) -> bool {
        let path = self.source_path.to_lowercase();
        let id = self.id.to_lowercase();
        PATH_PATTERNS.iter().any(|p| path.contains(p)) || ID_PATTERNS.iter().any(|p| id.contains(p))
    }
}

/// Index of the cover among `candidates`, if any.
///
/// First match wins: an explicit marker (metadata before property), then
/// the conventional naming pattern (shortest path on ties), then the first
/// image in `referenced` (image paths in reading order). Only images qualify.
pub fn detect_cover(candidates: &[AssetCandidate], referenced: &[String]) -> Option<usize> {
    let images = || candidates.iter().enumerate().filter(|(_, c)| c.is_image());

    if let Some((i, _)) = images()
        .filter_map(|(i, c)| c.cover_marker.map(|m| (i, m)))
        .min_by_key(|(i, m)| (*m, *i))
    {
        return Some(i);
    }

    if let Some((i, _)) = images()
        .filter(|(_, c)| c.matches_naming_pattern())
        .min_by_key(|(i, c)| (c.source_path.len(), *i))
    {
        return Some(i);
    }

    referenced.iter().find_map(|path| {
        images()
            .find(|(_, c)| &c.source_path == path)
            .map(|(i, _)| i)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(id: &str, path: &str) -> AssetCandidate {
        AssetCandidate::new(id, path, "image/png")
    }

    #[test]
    fn test_metadata_marker_beats_property_and_pattern() {
        let candidates = vec![
            png("front", "img/cover.png"),
            png("p", "img/p.png").with_cover_marker(CoverMarker::Property),
            png("m", "img/m.png").with_cover_marker(CoverMarker::Metadata),
        ];
        assert_eq!(detect_cover(&candidates, &[]), Some(2));
    }

    #[test]
    fn test_explicit_marker_beats_naming_pattern() {
        let candidates = vec![
            png("cover-img", "img/cover.png"),
            png("x", "img/x.png").with_cover_marker(CoverMarker::Property),
        ];
        assert_eq!(detect_cover(&candidates, &[]), Some(1));
    }

    #[test]
    fn test_naming_pattern_shortest_path() {
        let candidates = vec![
            png("a", "images/long/front-cover.png"),
            png("b", "img/titlepage.png"),
            png("c", "img/plain.png"),
        ];
        assert_eq!(detect_cover(&candidates, &[]), Some(1));

        let by_id = vec![png("c1", "img/a.png"), png("couverture", "img/b.png")];
        assert_eq!(detect_cover(&by_id, &[]), Some(1));
    }

    #[test]
    fn test_first_referenced_image() {
        let candidates = vec![png("a", "img/a.png"), png("b", "img/b.png")];
        let referenced = vec!["img/missing.png".to_string(), "img/b.png".to_string()];
        assert_eq!(detect_cover(&candidates, &referenced), Some(1));
        assert_eq!(detect_cover(&candidates, &[]), None);
    }

    #[test]
    fn test_only_images_qualify() {
        let candidates = vec![
            AssetCandidate::new("cover-font", "fonts/cover.ttf", "font/ttf")
                .with_cover_marker(CoverMarker::Metadata),
        ];
        assert_eq!(detect_cover(&candidates, &[]), None);
    }
}
