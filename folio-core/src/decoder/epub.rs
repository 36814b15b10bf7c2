//! EPUB decoder implementation

use super::normalize::{document_title, first_heading, image_references, Normalizer};
use super::Decoder;
use crate::assets::{AssetCandidate, AssetManager, CoverMarker, RewriteMapBuilder};
use crate::config::{ExportOptions, DEFAULT_LANGUAGE};
use crate::container::{resolve_reading_order, ContentDocument, EpubArchive, Package};
use crate::encoder::plan_chapters_with_headings;
use crate::error::{Result, StructureError};
use crate::media;
use crate::types::{Book, Chapter, Metadata};
use scraper::Html;
use std::io::Read;
use tracing::{debug, info, warn};

/// Decoder for EPUB 2/3 packages.
///
/// Chapter file names and link targets depend on the export options, so the
/// decoder is built with the options of the run.
pub struct EpubDecoder {
    options: ExportOptions,
    fallback_title: String,
}

impl EpubDecoder {
    pub fn new(options: ExportOptions) -> Self {
        Self {
            options,
            fallback_title: "Untitled".to_string(),
        }
    }

    /// Title used when the package declares none
    pub fn with_fallback_title(mut self, title: impl Into<String>) -> Self {
        self.fallback_title = title.into();
        self
    }

    fn metadata(&self, package: &Package) -> Metadata {
        let meta = &package.metadata;
        let title = meta
            .title
            .clone()
            .unwrap_or_else(|| self.fallback_title.clone());
        let language = meta
            .language
            .clone()
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let mut metadata = Metadata::new(title, language);
        metadata.creator = meta.creators.clone();
        metadata.description = meta.description.clone();
        if let Some(id) = &meta.identifier {
            metadata.identifier = id.clone();
        }
        metadata
    }

    /// Parse every content document, skipping entries missing from the archive
    fn load_documents(
        archive: &mut EpubArchive,
        order: Vec<ContentDocument>,
    ) -> Result<Vec<(ContentDocument, Html)>> {
        let mut documents = Vec::with_capacity(order.len());
        for doc in order {
            match archive.read_string(&doc.path) {
                Ok(source) => {
                    let html = Html::parse_document(&source);
                    documents.push((doc, html));
                }
                Err(StructureError::MissingEntry(path)) => {
                    warn!("Content document {} is missing from the archive, skipping", path);
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(documents)
    }
}

impl Decoder for EpubDecoder {
    fn decode(&self, reader: &mut dyn Read) -> Result<Book> {
        self.options.validate()?;

        let mut archive = EpubArchive::from_reader(reader)?;
        let package = archive.read_package()?;
        let order = resolve_reading_order(&package)?;
        debug!("Resolved {} content documents", order.len());

        let documents = Self::load_documents(&mut archive, order)?;

        // Plan chapters before the map is finished so documents can link to each other
        let titles: Vec<String> = documents
            .iter()
            .enumerate()
            .map(|(i, (_, html))| document_title(html).unwrap_or_else(|| format!("Chapter {}", i + 1)))
            .collect();
        let headings: Vec<Option<String>> = documents.iter().map(|(_, html)| first_heading(html)).collect();
        let plans = plan_chapters_with_headings(&titles, &headings, &self.options);

        let mut builder = RewriteMapBuilder::new();
        for ((doc, _), plan) in documents.iter().zip(&plans) {
            builder.insert(&doc.path, plan.link_target(&self.options));
        }

        let asset_plan = if self.options.extract_images {
            let candidates = asset_candidates(&package);
            let referenced: Vec<String> = documents
                .iter()
                .flat_map(|(doc, html)| image_references(html, &doc.path))
                .collect();
            let plan = AssetManager::new(&self.options.image_dir).plan(&candidates, &referenced);
            plan.register(&mut builder);
            Some(plan)
        } else {
            None
        };

        let map = builder.finish();
        let normalizer = Normalizer::new(&map).with_asset_rewriting(self.options.extract_images);

        let mut book = Book::with_metadata(self.metadata(&package));
        for ((doc, html), plan) in documents.iter().zip(plans) {
            let normalized = normalizer.normalize(html, &doc.path)?;
            let chapter = Chapter::new(plan.title, plan.ordinal)
                .with_id(doc.id.clone())
                .with_file_name(plan.file_name)
                .with_content(normalized.nodes);
            book.add_chapter(chapter);
        }

        if let Some(plan) = asset_plan {
            book.assets = plan.load(&mut archive);
        }

        info!(
            "Decoded '{}': {} chapters, {} assets",
            book.title(),
            book.chapters.len(),
            book.assets.len()
        );
        Ok(book)
    }
}

/// Every non-text manifest item, with the package's cover markers attached
fn asset_candidates(package: &Package) -> Vec<AssetCandidate> {
    package
        .manifest
        .iter()
        .filter(|item| !media::is_text_mime(&item.media_type))
        .map(|item| {
            let mut candidate =
                AssetCandidate::new(item.id.clone(), item.path.clone(), item.media_type.clone());
            if package.metadata.cover_id.as_deref() == Some(item.id.as_str()) {
                candidate = candidate.with_cover_marker(CoverMarker::Metadata);
            } else if item.has_property("cover-image") {
                candidate = candidate.with_cover_marker(CoverMarker::Property);
            }
            candidate
        })
        .collect()
}
