//! Asset naming, planning and loading

use super::cover::{detect_cover, AssetCandidate};
use super::map::RewriteMapBuilder;
use crate::error::AssetReadError;
use crate::media;
use crate::naming::{sanitize_file_name, unique_file_name};
use crate::types::Asset;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where asset bytes come from
pub trait AssetSource {
    /// Read the bytes stored at `path` (archive entry or relative file path)
    fn read_asset(&mut self, path: &str) -> Result<Vec<u8>, AssetReadError>;
}

/// Reads assets from the filesystem, relative to a root directory
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl AssetSource for FsAssetSource {
    fn read_asset(&mut self, path: &str) -> Result<Vec<u8>, AssetReadError> {
        std::fs::read(self.root.join(path)).map_err(|e| AssetReadError {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Output location chosen for one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedAsset {
    pub source_path: String,
    pub output_path: String,
    pub media_type: String,
    pub is_cover: bool,
}

/// Naming decisions for every candidate, cover first
#[derive(Debug, Clone, Default)]
pub struct AssetPlan {
    pub entries: Vec<PlannedAsset>,
}

impl AssetPlan {
    /// Add every planned asset to the map builder
    pub fn register(&self, builder: &mut RewriteMapBuilder) {
        for entry in &self.entries {
            builder.insert(&entry.source_path, &entry.output_path);
        }
    }

    /// Load bytes for every planned asset.
    ///
    /// A failed read is logged and the asset skipped; its rewrite entry stays.
    pub fn load(self, source: &mut dyn AssetSource) -> Vec<Asset> {
        let mut assets = Vec::with_capacity(self.entries.len());
        for entry in self.entries {
            match source.read_asset(&entry.source_path) {
                Ok(data) => {
                    let mut asset = Asset::new(
                        entry.source_path,
                        entry.output_path,
                        entry.media_type,
                        data,
                    );
                    asset.is_cover = entry.is_cover;
                    assets.push(asset);
                }
                Err(e) => warn!("{}, skipping", e),
            }
        }
        assets
    }
}

/// Assigns output names to binary resources
#[derive(Debug, Clone)]
pub struct AssetManager {
    image_dir: String,
}

impl AssetManager {
    pub fn new(image_dir: impl Into<String>) -> Self {
        Self {
            image_dir: image_dir.into().trim_matches('/').to_string(),
        }
    }

    pub fn image_dir(&self) -> &str {
        &self.image_dir
    }

    /// Choose the cover and a unique output path for every candidate.
    ///
    /// The cover becomes `cover.<ext>`; other assets keep their sanitized file
    /// name with `_1`, `_2`, ... appended on collision. Candidates sharing a
    /// source path are planned once.
    pub fn plan(&self, candidates: &[AssetCandidate], referenced: &[String]) -> AssetPlan {
        let cover = detect_cover(candidates, referenced);
        let mut taken = HashSet::new();
        let mut seen = HashSet::new();
        let mut plan = AssetPlan::default();

        if let Some(i) = cover {
            let candidate = &candidates[i];
            let name = unique_file_name(&format!("cover.{}", cover_extension(candidate)), &mut taken);
            debug!("Cover image {} -> {}", candidate.source_path, name);
            seen.insert(candidate.source_path.as_str());
            plan.entries.push(self.planned(candidate, &name, true));
        }

        for candidate in candidates {
            if !seen.insert(candidate.source_path.as_str()) {
                continue;
            }
            let base = candidate
                .source_path
                .rsplit('/')
                .next()
                .unwrap_or(&candidate.source_path);
            let name = unique_file_name(&sanitize_file_name(base), &mut taken);
            plan.entries.push(self.planned(candidate, &name, false));
        }

        plan
    }

    fn planned(&self, candidate: &AssetCandidate, name: &str, is_cover: bool) -> PlannedAsset {
        PlannedAsset {
            source_path: candidate.source_path.clone(),
            output_path: format!("{}/{}", self.image_dir, name),
            media_type: candidate.media_type.clone(),
            is_cover,
        }
    }
}

fn cover_extension(candidate: &AssetCandidate) -> String {
    if let Some(ext) = media::extension_from_mime(&candidate.media_type) {
        return ext.to_string();
    }
    Path::new(&candidate.source_path)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "jpg".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::CoverMarker;
    use std::collections::HashMap;

    struct MemorySource(HashMap<String, Vec<u8>>);

    impl AssetSource for MemorySource {
        fn read_asset(&mut self, path: &str) -> Result<Vec<u8>, AssetReadError> {
            self.0.get(path).cloned().ok_or_else(|| AssetReadError {
                path: path.to_string(),
                reason: "not found".to_string(),
            })
        }
    }

    #[test]
    fn test_cover_named_first_and_others_deduplicated() {
        let candidates = vec![
            AssetCandidate::new("a", "OEBPS/x/pic.png", "image/png"),
            AssetCandidate::new("b", "OEBPS/y/pic.png", "image/png"),
            AssetCandidate::new("c", "OEBPS/Front Image.jpeg", "image/jpeg")
                .with_cover_marker(CoverMarker::Property),
        ];
        let plan = AssetManager::new("images").plan(&candidates, &[]);
        let outputs: Vec<_> = plan.entries.iter().map(|e| e.output_path.as_str()).collect();
        assert_eq!(
            outputs,
            vec!["images/cover.jpg", "images/pic.png", "images/pic_1.png"]
        );
        assert_eq!(plan.entries.iter().find(|e| e.is_cover).unwrap().source_path, "OEBPS/Front Image.jpeg");
    }

    #[test]
    fn test_asset_named_cover_does_not_collide() {
        let candidates = vec![
            AssetCandidate::new("m", "a.png", "image/png").with_cover_marker(CoverMarker::Metadata),
            AssetCandidate::new("n", "cover.png", "image/png"),
        ];
        let plan = AssetManager::new("img/").plan(&candidates, &[]);
        assert_eq!(plan.entries[0].output_path, "img/cover.png");
        assert_eq!(plan.entries[1].output_path, "img/cover_1.png");
    }

    #[test]
    fn test_register_and_load() {
        let candidates = vec![
            AssetCandidate::new("a", "a.png", "image/png"),
            AssetCandidate::new("b", "b.png", "image/png"),
        ];
        let referenced = vec!["b.png".to_string()];
        let plan = AssetManager::new("images").plan(&candidates, &referenced);

        let mut builder = RewriteMapBuilder::new();
        plan.register(&mut builder);
        let map = builder.finish();
        assert_eq!(map.get("b.png"), Some("images/cover.png"));
        assert_eq!(map.get("a.png"), Some("images/a.png"));

        let mut source = MemorySource(HashMap::from([("b.png".to_string(), vec![1u8])]));
        let assets = plan.load(&mut source);
        assert_eq!(assets.len(), 1);
        assert!(assets[0].is_cover);
        assert_eq!(assets[0].output_path, "images/cover.png");
    }

    #[test]
    fn test_fs_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.png"), b"png").unwrap();
        let mut source = FsAssetSource::new(dir.path());
        assert_eq!(source.read_asset("a.png").unwrap(), b"png");
        assert!(source.read_asset("b.png").is_err());
    }
}
