//! Asset management: cover detection, output naming, the rewrite map
//!
//! Planning runs before any markup is normalized. Every planned asset and
//! every content document gets an entry in a [`RewriteMapBuilder`], which is
//! then finished into the immutable [`RewriteMap`] that normalization reads.

mod cover;
mod manager;
mod map;

pub use cover::{detect_cover, AssetCandidate, CoverMarker};
pub use manager::{AssetManager, AssetPlan, AssetSource, FsAssetSource, PlannedAsset};
pub use map::{RewriteMap, RewriteMapBuilder};
