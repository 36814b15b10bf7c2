//! Markdown decoder implementation

use super::front_matter::{split_front_matter, FrontMatter};
use super::split::{split_sections, Section};
use super::Decoder;
use crate::assets::{
    AssetCandidate, AssetManager, CoverMarker, FsAssetSource, RewriteMap, RewriteMapBuilder,
};
use crate::config::{ImportOptions, DEFAULT_IMAGE_DIR, DEFAULT_LANGUAGE, DEFAULT_PREFIX};
use crate::error::{FolioError, Result};
use crate::href::{is_external, join_path, parent_dir, split_fragment};
use crate::media;
use crate::naming::{chapter_file_name, ordinal_width, slugify};
use crate::types::{collapse_whitespace, push_paragraph_break, push_text, Book, Chapter, Metadata, Node};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Decoder for Markdown: a single flat document, or an index whose links
/// name one Markdown file per chapter.
///
/// A document is read as an index when it is an `index.md` (or a directory
/// holding one) or when its body is nothing but a list of links.
pub struct MarkdownDecoder {
    options: ImportOptions,
    /// Directory that relative image and chapter paths are read from
    asset_root: Option<PathBuf>,
    fallback_title: String,
    /// Source is an `index.md`: its links name the chapter files
    index: bool,
}

/// A chapter's source location and content, before naming
struct SourceChapter {
    /// Markdown file the chapter came from (index import only)
    source_path: Option<String>,
    /// Directory that the chapter's relative references resolve against
    source_dir: String,
    section: Section,
}

impl MarkdownDecoder {
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            asset_root: None,
            fallback_title: "Untitled".to_string(),
            index: false,
        }
    }

    /// Resolve images and linked chapter files against this directory
    pub fn with_asset_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.asset_root = Some(root.into());
        self
    }

    /// Title used when neither the options nor the header give one
    pub fn with_fallback_title(mut self, title: impl Into<String>) -> Self {
        self.fallback_title = title.into();
        self
    }

    /// Decode a Markdown file, an index file or a directory holding `index.md`
    pub fn decode_path(&self, path: &Path) -> Result<Book> {
        let path = if path.is_dir() {
            path.join("index.md")
        } else {
            path.to_path_buf()
        };
        let text = std::fs::read_to_string(&path)?;

        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled");
        let index = stem.eq_ignore_ascii_case("index");
        let fallback = if index {
            root.canonicalize()
                .ok()
                .and_then(|p| p.file_name().and_then(|n| n.to_str()).map(str::to_string))
                .unwrap_or_else(|| stem.to_string())
        } else {
            stem.to_string()
        };

        let decoder = MarkdownDecoder {
            options: self.options.clone(),
            asset_root: Some(self.asset_root.clone().unwrap_or(root)),
            fallback_title: fallback,
            index,
        };
        decoder.decode_text(&text)
    }

    /// Decode Markdown source held in memory
    pub fn decode_text(&self, text: &str) -> Result<Book> {
        self.options.validate()?;

        let (front, body) = split_front_matter(text);
        let front = match front {
            None => FrontMatter::default(),
            Some(Ok(front)) => front,
            Some(Err(e)) => {
                warn!("Ignoring header block: {}", e);
                FrontMatter::default()
            }
        };

        let metadata = self.metadata(&front);
        let nodes = parse_markdown(body);

        let linked = linked_markdown_files(&nodes);
        let sources = match &self.asset_root {
            Some(root) if !linked.is_empty() && (self.index || is_link_list(&nodes)) => {
                debug!("Importing {} linked chapter files", linked.len());
                self.read_linked_chapters(root, &linked)?
            }
            _ => split_sections(nodes, self.options.chapter_level, &metadata.title)
                .into_iter()
                .map(|section| SourceChapter {
                    source_path: None,
                    source_dir: String::new(),
                    section,
                })
                .collect(),
        };

        let book = self.assemble(metadata, front.cover.as_deref(), sources);
        info!(
            "Decoded '{}': {} chapters, {} assets",
            book.title(),
            book.chapters.len(),
            book.assets.len()
        );
        Ok(book)
    }

    /// Overrides, then header values, then defaults
    fn metadata(&self, front: &FrontMatter) -> Metadata {
        let title = self
            .options
            .title
            .clone()
            .or_else(|| front.title.clone())
            .unwrap_or_else(|| self.fallback_title.clone());
        let language = self
            .options
            .language
            .clone()
            .or_else(|| front.language.clone())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        let mut metadata = Metadata::new(title, language);
        metadata.creator = match &self.options.author {
            Some(author) => vec![author.clone()],
            None => front.authors.clone(),
        };
        metadata.description = self
            .options
            .description
            .clone()
            .or_else(|| front.description.clone());
        metadata
    }

    fn read_linked_chapters(&self, root: &Path, linked: &[(String, String)]) -> Result<Vec<SourceChapter>> {
        let mut sources = Vec::with_capacity(linked.len());
        for (path, label) in linked {
            let text = std::fs::read_to_string(root.join(path)).map_err(|e| {
                FolioError::Io(std::io::Error::new(e.kind(), format!("{path}: {e}")))
            })?;
            let (_, body) = split_front_matter(&text);
            let content = parse_markdown(body);

            let first_heading = content.iter().find_map(|n| match n {
                Node::Heading { level, text } => Some((*level, text.clone())),
                _ => None,
            });
            let title = if !label.is_empty() {
                label.clone()
            } else if let Some((_, text)) = &first_heading {
                text.clone()
            } else {
                Path::new(path)
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .unwrap_or(path)
                    .to_string()
            };

            sources.push(SourceChapter {
                source_path: Some(path.clone()),
                source_dir: parent_dir(path).to_string(),
                section: Section {
                    title,
                    level: first_heading.map(|(level, _)| level),
                    content,
                },
            });
        }
        Ok(sources)
    }

    /// Name chapters, relocate assets and rewrite references
    fn assemble(&self, metadata: Metadata, cover: Option<&str>, sources: Vec<SourceChapter>) -> Book {
        let width = ordinal_width(sources.len());
        let file_names: Vec<String> = sources
            .iter()
            .enumerate()
            .map(|(i, s)| chapter_file_name(DEFAULT_PREFIX, i, width, &slugify(&s.section.title), "xhtml"))
            .collect();

        let mut builder = RewriteMapBuilder::new();
        for (source, file_name) in sources.iter().zip(&file_names) {
            if let Some(path) = &source.source_path {
                builder.insert(path.clone(), file_name.clone());
            }
        }

        let asset_plan = self.asset_root.as_ref().map(|_| {
            let (candidates, referenced) = asset_candidates(&sources, cover);
            let plan = AssetManager::new(DEFAULT_IMAGE_DIR).plan(&candidates, &referenced);
            plan.register(&mut builder);
            plan
        });
        let map = builder.finish();

        let mut book = Book::with_metadata(metadata);
        for (i, (source, file_name)) in sources.into_iter().zip(file_names).enumerate() {
            let content = rewrite_references(source.section.content, &source.source_dir, &map);
            let mut chapter = Chapter::new(source.section.title, i)
                .with_file_name(file_name)
                .with_content(content);
            chapter.level = source.section.level;
            book.add_chapter(chapter);
        }

        if let (Some(plan), Some(root)) = (asset_plan, &self.asset_root) {
            book.assets = plan.load(&mut FsAssetSource::new(root));
        }
        book
    }
}

impl Decoder for MarkdownDecoder {
    fn decode(&self, reader: &mut dyn Read) -> Result<Book> {
        let mut text = String::new();
        reader.read_to_string(&mut text)?;
        self.decode_text(&text)
    }
}

/// Image candidates in reference order, with the header's cover marked
fn asset_candidates(sources: &[SourceChapter], cover: Option<&str>) -> (Vec<AssetCandidate>, Vec<String>) {
    let cover_path = cover
        .map(str::trim)
        .filter(|c| !c.is_empty() && !is_external(c))
        .map(|c| join_path("", split_fragment(c).0));

    let mut referenced = Vec::new();
    for source in sources {
        for node in &source.section.content {
            if let Node::Image { target, .. } = node {
                if let Some(path) = local_path(target, &source.source_dir) {
                    referenced.push(path);
                }
            }
        }
    }

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for path in cover_path.iter().chain(referenced.iter()) {
        if !seen.insert(path.clone()) {
            continue;
        }
        let mut candidate = AssetCandidate::new(path.clone(), path.clone(), media::mime_from_path(path));
        if cover_path.as_deref() == Some(path.as_str()) {
            candidate = candidate.with_cover_marker(CoverMarker::Metadata);
        }
        candidates.push(candidate);
    }
    (candidates, referenced)
}

/// Filesystem path of an internal reference, relative to the asset root
/// unless the reference is absolute
fn local_path(target: &str, source_dir: &str) -> Option<String> {
    let target = target.trim();
    if target.is_empty() || target.starts_with('#') || is_external(target) {
        return None;
    }
    let (path, _) = split_fragment(target);
    Some(join_path(source_dir, path))
}

/// Rewrite image and link targets found in `map`; others are left unchanged
fn rewrite_references(nodes: Vec<Node>, source_dir: &str, map: &RewriteMap) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|node| match node {
            Node::Image { target, alt } => {
                let target = local_path(&target, source_dir)
                    .and_then(|p| map.get(&p).map(str::to_string))
                    .unwrap_or(target);
                Node::Image { target, alt }
            }
            Node::Link { target, label } => {
                let rewritten = local_path(&target, source_dir).and_then(|p| {
                    map.get(&p).map(|mapped| match split_fragment(&target).1 {
                        Some(f) if !f.is_empty() => format!("{mapped}#{f}"),
                        _ => mapped.to_string(),
                    })
                });
                Node::Link {
                    target: rewritten.unwrap_or(target),
                    label,
                }
            }
            other => other,
        })
        .collect()
}

/// Whether a body holds only headings, images and links, as an exported
/// index does
fn is_link_list(nodes: &[Node]) -> bool {
    nodes.iter().all(|n| match n {
        Node::Text(text) => text.trim().is_empty(),
        Node::Heading { .. } | Node::Link { .. } | Node::Image { .. } => true,
        other => other.is_break(),
    })
}

/// Local `.md` link targets (path, label) in first-seen order
fn linked_markdown_files(nodes: &[Node]) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    nodes
        .iter()
        .filter_map(|n| match n {
            Node::Link { target, label } => {
                let path = local_path(target, "")?;
                let is_markdown = Path::new(&path)
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"));
                (is_markdown && seen.insert(path.clone())).then(|| (path, label.clone()))
            }
            _ => None,
        })
        .collect()
}

/// Parse Markdown into intermediate nodes
pub fn parse_markdown(content: &str) -> Vec<Node> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut state = ParserState::new();
    for event in Parser::new_ext(content, options) {
        state.process_event(event);
    }
    state.finish()
}

/// Text being gathered for a node that is emitted at its end tag
enum Capture {
    Heading { level: u8, text: String },
    Link { target: String, label: String },
    Image { target: String, alt: String },
}

impl Capture {
    fn text_mut(&mut self) -> &mut String {
        match self {
            Capture::Heading { text, .. } => text,
            Capture::Link { label, .. } => label,
            Capture::Image { alt, .. } => alt,
        }
    }
}

/// Parser state during event processing
struct ParserState {
    nodes: Vec<Node>,
    captures: Vec<Capture>,
    in_code_block: bool,
}

impl ParserState {
    fn new() -> Self {
        Self {
            nodes: Vec::new(),
            captures: Vec::new(),
            in_code_block: false,
        }
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(end) => self.end(end),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.push_text(&code),
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => {
                if let Some(capture) = self.captures.last_mut() {
                    capture.text_mut().push(' ');
                } else {
                    self.nodes.push(Node::LineBreak);
                }
            }
            Event::Rule => {
                push_paragraph_break(&mut self.nodes);
                self.nodes.push(Node::SectionBreak);
            }
            // Raw HTML is not part of the model
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { level, .. } => {
                push_paragraph_break(&mut self.nodes);
                self.captures.push(Capture::Heading {
                    level: heading_level(level),
                    text: String::new(),
                });
            }
            Tag::Link { dest_url, .. } => self.captures.push(Capture::Link {
                target: dest_url.to_string(),
                label: String::new(),
            }),
            Tag::Image { dest_url, .. } => self.captures.push(Capture::Image {
                target: dest_url.to_string(),
                alt: String::new(),
            }),
            Tag::CodeBlock(_) => {
                push_paragraph_break(&mut self.nodes);
                self.in_code_block = true;
            }
            _ => {}
        }
    }

    fn end(&mut self, end: TagEnd) {
        match end {
            TagEnd::Heading(_) => {
                if let Some(Capture::Heading { level, text }) = self.captures.pop() {
                    let text = collapse_whitespace(&text);
                    if !text.is_empty() {
                        self.nodes.push(Node::heading(level, text));
                    }
                }
            }
            TagEnd::Link => {
                if let Some(Capture::Link { target, label }) = self.captures.pop() {
                    let label = collapse_whitespace(&label);
                    if !label.is_empty() {
                        self.push_node(Node::link(target, label));
                    }
                }
            }
            TagEnd::Image => {
                if let Some(Capture::Image { target, alt }) = self.captures.pop() {
                    // Images inside a link or heading are emitted on their own
                    self.nodes.push(Node::image(target, collapse_whitespace(&alt)));
                }
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                push_paragraph_break(&mut self.nodes);
            }
            TagEnd::TableCell => self.push_text(" "),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {}
            _ => push_paragraph_break(&mut self.nodes),
        }
    }

    fn push_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    fn push_text(&mut self, text: &str) {
        if let Some(capture) = self.captures.last_mut() {
            capture.text_mut().push_str(text);
            return;
        }
        if self.in_code_block {
            let mut lines = text.split('\n').peekable();
            while let Some(line) = lines.next() {
                push_text(&mut self.nodes, line);
                if lines.peek().is_some() {
                    self.nodes.push(Node::LineBreak);
                }
            }
            return;
        }
        push_text(&mut self.nodes, text);
    }

    fn finish(mut self) -> Vec<Node> {
        while matches!(self.nodes.last(), Some(Node::ParagraphBreak) | Some(Node::LineBreak)) {
            self.nodes.pop();
        }
        self.nodes
    }
}

fn heading_level(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
