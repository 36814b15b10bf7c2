//! EPUB 3 package assembler
//!
//! Writes the container in a fixed entry order: `mimetype` (stored), the
//! container document, the package document, navigation (EPUB 3 nav plus an
//! NCX for older readers), the stylesheet, chapters in reading order, then
//! assets.

use crate::container::CONTAINER_PATH;
use crate::error::PackageWriteError;
use crate::href::{is_external, split_fragment};
use crate::media::{self, is_precompressed};
use crate::naming::{sanitize_file_name, slugify, unique_anchor, unique_file_name};
use crate::types::{Asset, Book, Chapter, Node};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Seek, Write};
use tracing::{debug, warn};
use uuid::Uuid;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

// XML namespaces
const NS_CONTAINER: &str = "urn:oasis:names:tc:opendocument:xmlns:container";
const NS_OPF: &str = "http://www.idpf.org/2007/opf";
const NS_DC: &str = "http://purl.org/dc/elements/1.1/";
const NS_XHTML: &str = "http://www.w3.org/1999/xhtml";
const NS_OPS: &str = "http://www.idpf.org/2007/ops";
const NS_NCX: &str = "http://www.daisy.org/z3986/2005/ncx/";

const EPUB_MIME: &str = "application/epub+zip";
const CONTENT_DIR: &str = "OEBPS";
const PACKAGE_FILE: &str = "content.opf";
const NAV_FILE: &str = "nav.xhtml";
const NCX_FILE: &str = "toc.ncx";
const STYLESHEET: &str = "styles/default.css";
const DEFAULT_CSS: &str = include_str!("default.css");
const COVER_ID: &str = "cover-image";

/// Encoder for EPUB 3
#[derive(Debug, Clone, Default)]
pub struct EpubEncoder {
    /// Fixed modification time; the current time when unset
    modified: Option<DateTime<Utc>>,
}

impl EpubEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the `dcterms:modified` timestamp
    pub fn with_timestamp(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Assemble the package into an in-memory archive
    pub fn package(&self, book: &Book) -> std::result::Result<Vec<u8>, PackageWriteError> {
        let cursor = self.write_package(book, Cursor::new(Vec::new()))?;
        Ok(cursor.into_inner())
    }

    /// Assemble the package into `out`, returning it once the archive is finished
    pub fn write_package<W: Write + Seek>(
        &self,
        book: &Book,
        out: W,
    ) -> std::result::Result<W, PackageWriteError> {
        if book.chapters.is_empty() {
            return Err(PackageWriteError::NoChapters);
        }
        book.validate().map_err(PackageWriteError::Inconsistent)?;

        let layout = Layout::plan(book)?;
        let modified = self.modified.unwrap_or_else(Utc::now);
        let identifier = if book.metadata.identifier.trim().is_empty() {
            format!("urn:uuid:{}", Uuid::new_v4())
        } else {
            book.metadata.identifier.clone()
        };

        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);
        let deflated = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(out);

        zip.start_file("mimetype", stored)?;
        zip.write_all(EPUB_MIME.as_bytes())?;

        zip.start_file(CONTAINER_PATH, deflated)?;
        zip.write_all(&render_container()?)?;

        zip.start_file(format!("{CONTENT_DIR}/{PACKAGE_FILE}"), deflated)?;
        zip.write_all(&render_package(book, &layout, &identifier, modified)?)?;

        zip.start_file(format!("{CONTENT_DIR}/{NAV_FILE}"), deflated)?;
        zip.write_all(&render_nav(book, &layout)?)?;

        zip.start_file(format!("{CONTENT_DIR}/{NCX_FILE}"), deflated)?;
        zip.write_all(&render_ncx(book, &layout, &identifier)?)?;

        zip.start_file(format!("{CONTENT_DIR}/{STYLESHEET}"), deflated)?;
        zip.write_all(DEFAULT_CSS.as_bytes())?;

        for entry in &layout.chapters {
            zip.start_file(format!("{CONTENT_DIR}/{}", entry.href), deflated)?;
            zip.write_all(&render_chapter(entry.chapter, &book.metadata.language, &layout)?)?;
        }

        for entry in &layout.assets {
            let options = if is_precompressed(&entry.media_type) {
                stored
            } else {
                deflated
            };
            zip.start_file(format!("{CONTENT_DIR}/{}", entry.href), options)?;
            zip.write_all(&entry.asset.data)?;
        }

        debug!(
            "Packaged {} chapters and {} assets",
            layout.chapters.len(),
            layout.assets.len()
        );
        Ok(zip.finish()?)
    }
}

struct ChapterEntry<'a> {
    id: String,
    href: String,
    chapter: &'a Chapter,
}

struct AssetEntry<'a> {
    id: String,
    href: String,
    media_type: String,
    asset: &'a Asset,
}

/// Manifest ids and package paths, relative to the content directory
struct Layout<'a> {
    chapters: Vec<ChapterEntry<'a>>,
    assets: Vec<AssetEntry<'a>>,
    /// Chapter file names that changed on the way into the package
    renamed: HashMap<String, String>,
    asset_paths: HashSet<String>,
}

impl<'a> Layout<'a> {
    fn plan(book: &'a Book) -> std::result::Result<Self, PackageWriteError> {
        let mut taken: HashSet<String> = [PACKAGE_FILE, NAV_FILE, NCX_FILE, STYLESHEET]
            .into_iter()
            .map(String::from)
            .collect();

        let mut chapters = Vec::with_capacity(book.chapters.len());
        let mut renamed = HashMap::new();
        for chapter in &book.chapters {
            let href = unique_file_name(&xhtml_name(&chapter.file_name), &mut taken);
            if href != chapter.file_name {
                renamed.insert(chapter.file_name.clone(), href.clone());
            }
            chapters.push(ChapterEntry {
                id: format!("chapter-{:03}", chapter.ordinal + 1),
                href,
                chapter,
            });
        }

        let mut assets = Vec::with_capacity(book.assets.len());
        let mut asset_paths = HashSet::new();
        for (i, asset) in book.assets.iter().enumerate() {
            let href = asset.output_path.trim_start_matches('/').to_string();
            if href.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
                return Err(PackageWriteError::Inconsistent(format!(
                    "asset path '{}' is not a plain relative path",
                    asset.output_path
                )));
            }
            if !taken.insert(href.clone()) {
                return Err(PackageWriteError::Inconsistent(format!(
                    "asset path '{href}' collides with another package entry"
                )));
            }
            let media_type = if asset.media_type.is_empty() {
                media::mime_from_path(&href).to_string()
            } else {
                asset.media_type.clone()
            };
            let id = if asset.is_cover {
                COVER_ID.to_string()
            } else {
                format!("asset-{:02}", i + 1)
            };
            asset_paths.insert(href.clone());
            assets.push(AssetEntry {
                id,
                href,
                media_type,
                asset,
            });
        }

        Ok(Self {
            chapters,
            assets,
            renamed,
            asset_paths,
        })
    }

    fn cover(&self) -> Option<&AssetEntry<'a>> {
        self.assets.iter().find(|a| a.asset.is_cover)
    }

    /// Point a link at the packaged chapter file, keeping any fragment
    fn link_target(&self, target: &str) -> String {
        let (path, fragment) = split_fragment(target);
        match self.renamed.get(path) {
            Some(href) => match fragment {
                Some(fragment) => format!("{href}#{fragment}"),
                None => href.clone(),
            },
            None => target.to_string(),
        }
    }
}

/// `name` with an `.xhtml` extension and a file-system-safe stem
fn xhtml_name(name: &str) -> String {
    let stem = match name.rfind('.') {
        Some(i) if i > 0 => &name[..i],
        _ => name,
    };
    format!("{}.xhtml", sanitize_file_name(stem))
}

fn new_writer() -> Writer<Cursor<Vec<u8>>> {
    Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2)
}

fn write_decl<W: Write>(writer: &mut Writer<W>) -> std::result::Result<(), quick_xml::Error> {
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    Ok(())
}

/// Write a simple text element
fn write_text_element<W: Write>(
    writer: &mut Writer<W>,
    element: BytesStart<'_>,
    content: &str,
) -> std::result::Result<(), quick_xml::Error> {
    let end = element.to_end().into_owned();
    writer.write_event(Event::Start(element))?;
    writer.write_event(Event::Text(BytesText::new(content)))?;
    writer.write_event(Event::End(end))?;
    Ok(())
}

fn render_container() -> std::result::Result<Vec<u8>, quick_xml::Error> {
    let mut writer = new_writer();
    write_decl(&mut writer)?;

    let mut container = BytesStart::new("container");
    container.push_attribute(("version", "1.0"));
    container.push_attribute(("xmlns", NS_CONTAINER));
    writer.write_event(Event::Start(container))?;
    writer.write_event(Event::Start(BytesStart::new("rootfiles")))?;

    let full_path = format!("{CONTENT_DIR}/{PACKAGE_FILE}");
    let mut rootfile = BytesStart::new("rootfile");
    rootfile.push_attribute(("full-path", full_path.as_str()));
    rootfile.push_attribute(("media-type", "application/oebps-package+xml"));
    writer.write_event(Event::Empty(rootfile))?;

    writer.write_event(Event::End(BytesEnd::new("rootfiles")))?;
    writer.write_event(Event::End(BytesEnd::new("container")))?;
    Ok(writer.into_inner().into_inner())
}

fn render_package(
    book: &Book,
    layout: &Layout<'_>,
    identifier: &str,
    modified: DateTime<Utc>,
) -> std::result::Result<Vec<u8>, quick_xml::Error> {
    let metadata = &book.metadata;
    let mut writer = new_writer();
    write_decl(&mut writer)?;

    let mut package = BytesStart::new("package");
    package.push_attribute(("xmlns", NS_OPF));
    package.push_attribute(("version", "3.0"));
    package.push_attribute(("unique-identifier", "book-id"));
    package.push_attribute(("xml:lang", language(book)));
    writer.write_event(Event::Start(package))?;

    // Metadata
    let mut meta_elem = BytesStart::new("metadata");
    meta_elem.push_attribute(("xmlns:dc", NS_DC));
    meta_elem.push_attribute(("xmlns:opf", NS_OPF));
    writer.write_event(Event::Start(meta_elem))?;

    let mut id_elem = BytesStart::new("dc:identifier");
    id_elem.push_attribute(("id", "book-id"));
    write_text_element(&mut writer, id_elem, identifier)?;
    write_text_element(&mut writer, BytesStart::new("dc:title"), &metadata.title)?;
    for (i, creator) in metadata.creator.iter().enumerate() {
        let id = format!("creator-{}", i + 1);
        let mut creator_elem = BytesStart::new("dc:creator");
        creator_elem.push_attribute(("id", id.as_str()));
        write_text_element(&mut writer, creator_elem, creator)?;
    }
    write_text_element(&mut writer, BytesStart::new("dc:language"), language(book))?;
    if let Some(description) = &metadata.description {
        write_text_element(&mut writer, BytesStart::new("dc:description"), description)?;
    }
    write_text_element(
        &mut writer,
        BytesStart::new("dc:date"),
        &modified.to_rfc3339_opts(SecondsFormat::Secs, true),
    )?;
    let mut modified_elem = BytesStart::new("meta");
    modified_elem.push_attribute(("property", "dcterms:modified"));
    write_text_element(
        &mut writer,
        modified_elem,
        &modified.to_rfc3339_opts(SecondsFormat::Secs, true),
    )?;
    if layout.cover().is_some() {
        let mut cover = BytesStart::new("meta");
        cover.push_attribute(("name", "cover"));
        cover.push_attribute(("content", COVER_ID));
        writer.write_event(Event::Empty(cover))?;
    }
    writer.write_event(Event::End(BytesEnd::new("metadata")))?;

    // Manifest
    writer.write_event(Event::Start(BytesStart::new("manifest")))?;
    write_item(&mut writer, "nav", NAV_FILE, media::XHTML, Some("nav"))?;
    write_item(&mut writer, "ncx", NCX_FILE, media::NCX, None)?;
    write_item(&mut writer, "style", STYLESHEET, media::CSS, None)?;
    for entry in &layout.chapters {
        write_item(&mut writer, &entry.id, &entry.href, media::XHTML, None)?;
    }
    for entry in &layout.assets {
        let properties = entry.asset.is_cover.then_some("cover-image");
        write_item(&mut writer, &entry.id, &entry.href, &entry.media_type, properties)?;
    }
    writer.write_event(Event::End(BytesEnd::new("manifest")))?;

    // Spine: chapters only, in reading order
    let mut spine = BytesStart::new("spine");
    spine.push_attribute(("toc", "ncx"));
    writer.write_event(Event::Start(spine))?;
    for entry in &layout.chapters {
        let mut itemref = BytesStart::new("itemref");
        itemref.push_attribute(("idref", entry.id.as_str()));
        writer.write_event(Event::Empty(itemref))?;
    }
    writer.write_event(Event::End(BytesEnd::new("spine")))?;

    writer.write_event(Event::End(BytesEnd::new("package")))?;
    Ok(writer.into_inner().into_inner())
}

fn write_item<W: Write>(
    writer: &mut Writer<W>,
    id: &str,
    href: &str,
    media_type: &str,
    properties: Option<&str>,
) -> std::result::Result<(), quick_xml::Error> {
    let mut item = BytesStart::new("item");
    item.push_attribute(("id", id));
    item.push_attribute(("href", href));
    item.push_attribute(("media-type", media_type));
    if let Some(properties) = properties {
        item.push_attribute(("properties", properties));
    }
    writer.write_event(Event::Empty(item))?;
    Ok(())
}

fn render_nav(book: &Book, layout: &Layout<'_>) -> std::result::Result<Vec<u8>, quick_xml::Error> {
    let mut writer = new_writer();
    write_decl(&mut writer)?;
    writer.write_event(Event::DocType(BytesText::from_escaped("html")))?;
    start_html(&mut writer, book, "Contents")?;

    let mut nav = BytesStart::new("nav");
    nav.push_attribute(("epub:type", "toc"));
    nav.push_attribute(("id", "toc"));
    writer.write_event(Event::Start(nav))?;
    write_text_element(&mut writer, BytesStart::new("h1"), "Contents")?;
    writer.write_event(Event::Start(BytesStart::new("ol")))?;
    for entry in &layout.chapters {
        writer.write_event(Event::Start(BytesStart::new("li")))?;
        let mut link = BytesStart::new("a");
        link.push_attribute(("href", entry.href.as_str()));
        write_text_element(&mut writer, link, &entry.chapter.title)?;
        writer.write_event(Event::End(BytesEnd::new("li")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("ol")))?;
    writer.write_event(Event::End(BytesEnd::new("nav")))?;

    end_html(&mut writer)?;
    Ok(writer.into_inner().into_inner())
}

fn render_ncx(
    book: &Book,
    layout: &Layout<'_>,
    identifier: &str,
) -> std::result::Result<Vec<u8>, quick_xml::Error> {
    let mut writer = new_writer();
    write_decl(&mut writer)?;

    let mut ncx = BytesStart::new("ncx");
    ncx.push_attribute(("xmlns", NS_NCX));
    ncx.push_attribute(("version", "2005-1"));
    writer.write_event(Event::Start(ncx))?;

    writer.write_event(Event::Start(BytesStart::new("head")))?;
    for (name, content) in [
        ("dtb:uid", identifier),
        ("dtb:depth", "1"),
        ("dtb:totalPageCount", "0"),
        ("dtb:maxPageNumber", "0"),
    ] {
        let mut meta = BytesStart::new("meta");
        meta.push_attribute(("name", name));
        meta.push_attribute(("content", content));
        writer.write_event(Event::Empty(meta))?;
    }
    writer.write_event(Event::End(BytesEnd::new("head")))?;

    writer.write_event(Event::Start(BytesStart::new("docTitle")))?;
    write_text_element(&mut writer, BytesStart::new("text"), book.title())?;
    writer.write_event(Event::End(BytesEnd::new("docTitle")))?;

    writer.write_event(Event::Start(BytesStart::new("navMap")))?;
    for (i, entry) in layout.chapters.iter().enumerate() {
        let id = format!("navpoint-{}", i + 1);
        let order = (i + 1).to_string();
        let mut point = BytesStart::new("navPoint");
        point.push_attribute(("id", id.as_str()));
        point.push_attribute(("playOrder", order.as_str()));
        writer.write_event(Event::Start(point))?;

        writer.write_event(Event::Start(BytesStart::new("navLabel")))?;
        write_text_element(&mut writer, BytesStart::new("text"), &entry.chapter.title)?;
        writer.write_event(Event::End(BytesEnd::new("navLabel")))?;

        let mut content = BytesStart::new("content");
        content.push_attribute(("src", entry.href.as_str()));
        writer.write_event(Event::Empty(content))?;

        writer.write_event(Event::End(BytesEnd::new("navPoint")))?;
    }
    writer.write_event(Event::End(BytesEnd::new("navMap")))?;

    writer.write_event(Event::End(BytesEnd::new("ncx")))?;
    Ok(writer.into_inner().into_inner())
}

fn language(book: &Book) -> &str {
    let language = book.metadata.language.trim();
    if language.is_empty() {
        crate::config::DEFAULT_LANGUAGE
    } else {
        language
    }
}

fn start_html<W: Write>(
    writer: &mut Writer<W>,
    book: &Book,
    title: &str,
) -> std::result::Result<(), quick_xml::Error> {
    let mut html = BytesStart::new("html");
    html.push_attribute(("xmlns", NS_XHTML));
    html.push_attribute(("xmlns:epub", NS_OPS));
    html.push_attribute(("lang", language(book)));
    html.push_attribute(("xml:lang", language(book)));
    writer.write_event(Event::Start(html))?;

    writer.write_event(Event::Start(BytesStart::new("head")))?;
    write_text_element(writer, BytesStart::new("title"), title)?;
    let mut stylesheet = BytesStart::new("link");
    stylesheet.push_attribute(("rel", "stylesheet"));
    stylesheet.push_attribute(("type", "text/css"));
    stylesheet.push_attribute(("href", STYLESHEET));
    writer.write_event(Event::Empty(stylesheet))?;
    writer.write_event(Event::End(BytesEnd::new("head")))?;

    writer.write_event(Event::Start(BytesStart::new("body")))?;
    Ok(())
}

fn end_html<W: Write>(writer: &mut Writer<W>) -> std::result::Result<(), quick_xml::Error> {
    writer.write_event(Event::End(BytesEnd::new("body")))?;
    writer.write_event(Event::End(BytesEnd::new("html")))?;
    Ok(())
}

/// Serialize one chapter to XHTML.
///
/// Inline nodes are grouped into paragraphs; a chapter without a heading gets
/// its title as a level-1 heading.
fn render_chapter(
    chapter: &Chapter,
    language: &str,
    layout: &Layout<'_>,
) -> std::result::Result<Vec<u8>, quick_xml::Error> {
    // Indentation would leak whitespace into mixed content
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_decl(&mut writer)?;
    newline(&mut writer)?;
    writer.write_event(Event::DocType(BytesText::from_escaped("html")))?;
    newline(&mut writer)?;

    let mut html = BytesStart::new("html");
    html.push_attribute(("xmlns", NS_XHTML));
    html.push_attribute(("xmlns:epub", NS_OPS));
    html.push_attribute(("lang", language));
    html.push_attribute(("xml:lang", language));
    writer.write_event(Event::Start(html))?;
    newline(&mut writer)?;
    writer.write_event(Event::Start(BytesStart::new("head")))?;
    write_text_element(&mut writer, BytesStart::new("title"), &chapter.title)?;
    let mut stylesheet = BytesStart::new("link");
    stylesheet.push_attribute(("rel", "stylesheet"));
    stylesheet.push_attribute(("type", "text/css"));
    stylesheet.push_attribute(("href", STYLESHEET));
    writer.write_event(Event::Empty(stylesheet))?;
    writer.write_event(Event::End(BytesEnd::new("head")))?;
    newline(&mut writer)?;
    writer.write_event(Event::Start(BytesStart::new("body")))?;
    newline(&mut writer)?;

    let mut body = BodyWriter {
        writer: &mut writer,
        layout,
        in_paragraph: false,
        anchors: HashSet::new(),
    };
    if !chapter.has_heading() {
        body.node(&Node::heading(1, chapter.title.as_str()))?;
    }
    for node in &chapter.content {
        body.node(node)?;
    }
    body.close_paragraph()?;

    writer.write_event(Event::End(BytesEnd::new("body")))?;
    newline(&mut writer)?;
    writer.write_event(Event::End(BytesEnd::new("html")))?;
    newline(&mut writer)?;
    Ok(writer.into_inner().into_inner())
}

fn newline<W: Write>(writer: &mut Writer<W>) -> std::result::Result<(), quick_xml::Error> {
    writer.write_event(Event::Text(BytesText::from_escaped("\n")))?;
    Ok(())
}

struct BodyWriter<'w, 'l, W: Write> {
    writer: &'w mut Writer<W>,
    layout: &'l Layout<'l>,
    in_paragraph: bool,
    anchors: HashSet<String>,
}

impl<W: Write> BodyWriter<'_, '_, W> {
    fn node(&mut self, node: &Node) -> std::result::Result<(), quick_xml::Error> {
        match node {
            Node::Text(text) => {
                self.open_paragraph()?;
                self.writer.write_event(Event::Text(BytesText::new(text)))?;
            }
            Node::Heading { level, text } => {
                self.close_paragraph()?;
                let name = format!("h{}", (*level).clamp(1, 6));
                let id = unique_anchor(&slugify(text), &mut self.anchors);
                let mut heading = BytesStart::new(name.as_str());
                heading.push_attribute(("id", id.as_str()));
                write_text_element(self.writer, heading, text)?;
                newline(self.writer)?;
            }
            Node::ParagraphBreak => self.close_paragraph()?,
            Node::LineBreak => {
                if self.in_paragraph {
                    self.writer.write_event(Event::Empty(BytesStart::new("br")))?;
                }
            }
            Node::SectionBreak => {
                self.close_paragraph()?;
                self.writer.write_event(Event::Empty(BytesStart::new("hr")))?;
                newline(self.writer)?;
            }
            Node::Link { target, label } => {
                self.open_paragraph()?;
                let href = self.layout.link_target(target);
                let mut link = BytesStart::new("a");
                link.push_attribute(("href", href.as_str()));
                write_text_element(self.writer, link, label)?;
            }
            Node::Image { target, alt } => {
                self.open_paragraph()?;
                let (path, _) = split_fragment(target);
                if !is_external(target) && !self.layout.asset_paths.contains(path) {
                    warn!("Image '{}' is not part of the package", target);
                }
                let mut img = BytesStart::new("img");
                img.push_attribute(("src", target.as_str()));
                img.push_attribute(("alt", alt.as_str()));
                self.writer.write_event(Event::Empty(img))?;
            }
        }
        Ok(())
    }

    fn open_paragraph(&mut self) -> std::result::Result<(), quick_xml::Error> {
        if !self.in_paragraph {
            self.writer.write_event(Event::Start(BytesStart::new("p")))?;
            self.in_paragraph = true;
        }
        Ok(())
    }

    fn close_paragraph(&mut self) -> std::result::Result<(), quick_xml::Error> {
        if self.in_paragraph {
            self.writer.write_event(Event::End(BytesEnd::new("p")))?;
            newline(self.writer)?;
            self.in_paragraph = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{resolve_reading_order, EpubArchive};
    use chrono::TimeZone;
    use std::io::Read;

    fn sample_book() -> Book {
        let mut book = Book::new("Sample & Co", "fr");
        book.metadata.creator.push("Ann Author".into());
        book.metadata.description = Some("A test".into());
        book.add_chapter(
            Chapter::new("Opening", 0)
                .with_file_name("chapter-01-opening.xhtml")
                .with_content(vec![
                    Node::heading(1, "Opening"),
                    Node::text("Hello "),
                    Node::link("chapter-02-next.md#part", "next"),
                    Node::LineBreak,
                    Node::image("images/cover.png", "Cover"),
                ]),
        );
        book.add_chapter(
            Chapter::new("Next", 1)
                .with_file_name("chapter-02-next.md")
                .with_content(vec![Node::text("Body"), Node::SectionBreak, Node::text("More")]),
        );
        book.assets.push(
            Asset::new("src/cover.png", "images/cover.png", "image/png", vec![0x89, b'P']).as_cover(),
        );
        book.assets
            .push(Asset::new("src/notes.svg", "images/notes.svg", "image/svg+xml", b"<svg/>".to_vec()));
        book
    }

    fn encoder() -> EpubEncoder {
        EpubEncoder::new().with_timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap())
    }

    fn read_entry(bytes: &[u8], name: &str) -> String {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes.to_vec())).unwrap();
        let mut entry = zip.by_name(name).unwrap();
        let mut out = String::new();
        entry.read_to_string(&mut out).unwrap();
        out
    }

    #[test]
    fn test_archive_layout() {
        let bytes = encoder().package(&sample_book()).unwrap();
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..zip.len())
            .map(|i| zip.by_index(i).unwrap().name().to_string())
            .collect();
        assert_eq!(
            names,
            vec![
                "mimetype",
                "META-INF/container.xml",
                "OEBPS/content.opf",
                "OEBPS/nav.xhtml",
                "OEBPS/toc.ncx",
                "OEBPS/styles/default.css",
                "OEBPS/chapter-01-opening.xhtml",
                "OEBPS/chapter-02-next.xhtml",
                "OEBPS/images/cover.png",
                "OEBPS/images/notes.svg",
            ]
        );

        let mimetype = zip.by_index(0).unwrap();
        assert_eq!(mimetype.compression(), CompressionMethod::Stored);
        drop(mimetype);
        assert_eq!(
            zip.by_name("OEBPS/images/cover.png").unwrap().compression(),
            CompressionMethod::Stored
        );
        assert_eq!(
            zip.by_name("OEBPS/images/notes.svg").unwrap().compression(),
            CompressionMethod::Deflated
        );
    }

    #[test]
    fn test_package_document() {
        let bytes = encoder().package(&sample_book()).unwrap();
        let opf = read_entry(&bytes, "OEBPS/content.opf");
        assert!(opf.contains("<dc:title>Sample &amp; Co</dc:title>"));
        assert!(opf.contains("<dc:creator id=\"creator-1\">Ann Author</dc:creator>"));
        assert!(opf.contains("<dc:language>fr</dc:language>"));
        assert!(opf.contains("<meta property=\"dcterms:modified\">2024-05-01T12:00:00Z</meta>"));
        assert!(opf.contains("<meta name=\"cover\" content=\"cover-image\"/>"));
        assert!(opf.contains("properties=\"cover-image\""));

        let spine = &opf[opf.find("<spine").unwrap()..];
        let first = spine.find("chapter-001").unwrap();
        let second = spine.find("chapter-002").unwrap();
        assert!(first < second);
        assert!(!spine.contains("cover-image"));
    }

    #[test]
    fn test_reads_back_through_the_resolver() {
        let bytes = encoder().package(&sample_book()).unwrap();
        let mut archive = EpubArchive::from_bytes(bytes).unwrap();
        let package = archive.read_package().unwrap();
        assert_eq!(package.metadata.title.as_deref(), Some("Sample & Co"));
        assert_eq!(package.metadata.cover_id.as_deref(), Some("cover-image"));

        let order = resolve_reading_order(&package).unwrap();
        let paths: Vec<_> = order.iter().map(|d| d.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["OEBPS/chapter-01-opening.xhtml", "OEBPS/chapter-02-next.xhtml"]
        );
    }

    #[test]
    fn test_navigation_mirrors_chapters() {
        let bytes = encoder().package(&sample_book()).unwrap();
        let nav = read_entry(&bytes, "OEBPS/nav.xhtml");
        let opening = nav.find("<a href=\"chapter-01-opening.xhtml\">Opening</a>").unwrap();
        let next = nav.find("<a href=\"chapter-02-next.xhtml\">Next</a>").unwrap();
        assert!(opening < next);

        let ncx = read_entry(&bytes, "OEBPS/toc.ncx");
        assert!(ncx.contains("playOrder=\"2\""));
        assert!(ncx.contains("<content src=\"chapter-02-next.xhtml\"/>"));
    }

    #[test]
    fn test_chapter_markup() {
        let bytes = encoder().package(&sample_book()).unwrap();
        let first = read_entry(&bytes, "OEBPS/chapter-01-opening.xhtml");
        assert!(first.contains("<h1 id=\"opening\">Opening</h1>"));
        assert!(first.contains(
            "<p>Hello <a href=\"chapter-02-next.xhtml#part\">next</a><br/><img src=\"images/cover.png\" alt=\"Cover\"/></p>"
        ));

        // No heading in the body, so the title is added
        let second = read_entry(&bytes, "OEBPS/chapter-02-next.xhtml");
        assert!(second.contains("<h1 id=\"next\">Next</h1>"));
        assert!(second.contains("<p>Body</p>\n<hr/>\n<p>More</p>"));
    }

    #[test]
    fn test_rejects_empty_and_inconsistent_books() {
        let empty = Book::new("Empty", "en");
        assert!(matches!(
            encoder().package(&empty),
            Err(PackageWriteError::NoChapters)
        ));

        let mut book = sample_book();
        book.chapters[1].ordinal = 5;
        assert!(matches!(
            encoder().package(&book),
            Err(PackageWriteError::Inconsistent(_))
        ));

        let mut book = sample_book();
        book.assets[1].output_path = "../escape.svg".into();
        assert!(matches!(
            encoder().package(&book),
            Err(PackageWriteError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_mimetype_leads_the_raw_archive() {
        let out = encoder().package(&sample_book()).unwrap();
        assert_eq!(&out[30..38], b"mimetype");
        assert_eq!(&out[38..58], EPUB_MIME.as_bytes());
    }
}
