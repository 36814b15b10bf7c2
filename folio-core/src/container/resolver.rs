//! Reading order reconstruction from the manifest and spine

use super::opf::{ManifestItem, Package};
use crate::error::StructureError;
use crate::media;
use std::collections::HashSet;
use tracing::{debug, warn};

/// A content document in final reading order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDocument {
    /// Manifest id
    pub id: String,
    /// Archive path
    pub path: String,
    pub media_type: String,
}

impl From<&ManifestItem> for ContentDocument {
    fn from(item: &ManifestItem) -> Self {
        Self {
            id: item.id.clone(),
            path: item.path.clone(),
            media_type: item.media_type.clone(),
        }
    }
}

/// Manifest-order fallback candidates; the navigation document only reads
/// as a chapter when the spine lists it
fn is_chapter_candidate(item: &ManifestItem) -> bool {
    media::is_content_document(&item.media_type) && !item.is_nav()
}

/// Ordered content documents for a package.
///
/// Spine entries that name an unknown id, a non-content item or an already
/// listed item are skipped with a warning. When the spine is empty or
/// nothing in it resolves, manifest declaration order filtered to content
/// documents (minus the navigation document) is used instead. Non-linear
/// entries keep their spine position.
pub fn resolve_reading_order(package: &Package) -> Result<Vec<ContentDocument>, StructureError> {
    if package.manifest.is_empty() {
        return Err(StructureError::EmptyManifest(package.path.clone()));
    }

    let mut seen = HashSet::new();
    let mut order = Vec::new();

    for entry in &package.spine {
        let Some(item) = package.item(&entry.idref) else {
            warn!("Spine entry '{}' has no manifest item, skipping", entry.idref);
            continue;
        };
        if !media::is_content_document(&item.media_type) {
            warn!(
                "Spine entry '{}' is not a content document ({}), skipping",
                entry.idref, item.media_type
            );
            continue;
        }
        if !seen.insert(item.id.as_str()) {
            warn!("Spine entry '{}' repeats an earlier entry, skipping", entry.idref);
            continue;
        }
        if !entry.linear {
            debug!("Including non-linear spine entry '{}'", entry.idref);
        }
        order.push(ContentDocument::from(item));
    }

    if order.is_empty() {
        if !package.spine.is_empty() {
            warn!("No spine entry resolved, falling back to manifest order");
        } else {
            debug!("Spine is empty, using manifest order");
        }
        order = package
            .manifest
            .iter()
            .filter(|item| is_chapter_candidate(item))
            .map(ContentDocument::from)
            .collect();
    }

    if order.is_empty() {
        warn!("Package {} declares no content documents", package.path);
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::opf::SpineEntry;

    fn item(id: &str, path: &str, media_type: &str) -> ManifestItem {
        ManifestItem {
            id: id.to_string(),
            href: path.to_string(),
            path: path.to_string(),
            media_type: media_type.to_string(),
            properties: Vec::new(),
        }
    }

    fn spine(ids: &[&str]) -> Vec<SpineEntry> {
        ids.iter()
            .map(|id| SpineEntry {
                idref: id.to_string(),
                linear: true,
            })
            .collect()
    }

    fn package(manifest: Vec<ManifestItem>, ids: &[&str]) -> Package {
        Package {
            path: "content.opf".into(),
            manifest,
            spine: spine(ids),
            ..Package::default()
        }
    }

    fn ids(order: &[ContentDocument]) -> Vec<&str> {
        order.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_spine_order_wins_over_manifest_order() {
        let pkg = package(
            vec![
                item("c3", "c3.xhtml", media::XHTML),
                item("c1", "c1.xhtml", media::XHTML),
                item("c2", "c2.xhtml", media::XHTML),
            ],
            &["c1", "c2", "c3"],
        );
        assert_eq!(ids(&resolve_reading_order(&pkg).unwrap()), vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn test_skips_unknown_non_content_and_duplicates() {
        let mut nav = item("nav", "nav.xhtml", media::XHTML);
        nav.properties.push("nav".into());
        let pkg = package(
            vec![
                item("c1", "c1.xhtml", media::XHTML),
                nav,
                item("img", "a.png", "image/png"),
                item("c2", "c2.html", "text/html"),
            ],
            &["c1", "ghost", "img", "c1", "c2"],
        );
        assert_eq!(ids(&resolve_reading_order(&pkg).unwrap()), vec!["c1", "c2"]);
    }

    #[test]
    fn test_spine_listed_nav_document_is_kept() {
        let mut nav = item("nav", "nav.xhtml", media::XHTML);
        nav.properties.push("nav".into());
        let manifest = vec![nav, item("c1", "c1.xhtml", media::XHTML)];

        let listed = package(manifest.clone(), &["nav", "c1"]);
        assert_eq!(ids(&resolve_reading_order(&listed).unwrap()), vec!["nav", "c1"]);

        let fallback = package(manifest, &[]);
        assert_eq!(ids(&resolve_reading_order(&fallback).unwrap()), vec!["c1"]);
    }

    #[test]
    fn test_falls_back_to_manifest_order() {
        let manifest = vec![
            item("css", "s.css", media::CSS),
            item("b", "b.xhtml", media::XHTML),
            item("a", "a.xhtml", media::XHTML),
        ];
        let empty = package(manifest.clone(), &[]);
        assert_eq!(ids(&resolve_reading_order(&empty).unwrap()), vec!["b", "a"]);

        let broken = package(manifest, &["ghost", "css"]);
        assert_eq!(ids(&resolve_reading_order(&broken).unwrap()), vec!["b", "a"]);
    }

    #[test]
    fn test_empty_manifest_is_an_error() {
        let pkg = package(Vec::new(), &["c1"]);
        assert!(matches!(
            resolve_reading_order(&pkg),
            Err(StructureError::EmptyManifest(_))
        ));
    }

    #[test]
    fn test_non_linear_entries_are_kept() {
        let mut pkg = package(
            vec![item("c1", "c1.xhtml", media::XHTML), item("n", "n.xhtml", media::XHTML)],
            &["c1", "n"],
        );
        pkg.spine[1].linear = false;
        assert_eq!(ids(&resolve_reading_order(&pkg).unwrap()), vec!["c1", "n"]);
    }
}
