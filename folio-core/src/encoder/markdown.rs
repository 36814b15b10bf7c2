//! Markdown encoder: chapter planning, index synthesis and Markdown emission

use crate::config::ExportOptions;
use crate::decoder::{render_front_matter, FrontMatter};
use crate::naming::{chapter_file_name, ordinal_width, slugify, unique_anchor};
use crate::types::{Asset, Book, Chapter, Node};
use std::collections::HashSet;
use tracing::debug;

/// Name of the synthesized index in split mode
pub const INDEX_FILE: &str = "index.md";

/// Where one chapter will live in the output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterPlan {
    /// 0-based position in reading order
    pub ordinal: usize,
    pub title: String,
    /// `<prefix>-<NN>-<slug>.md`
    pub file_name: String,
    /// Heading anchor used by links in single mode
    pub anchor: String,
}

impl ChapterPlan {
    /// What a link to this chapter points at: its file (split) or anchor (single)
    pub fn link_target(&self, options: &ExportOptions) -> String {
        if options.is_split() {
            self.file_name.clone()
        } else {
            format!("#{}", self.anchor)
        }
    }
}

/// Assign ordinal, file name and anchor to each chapter title
pub fn plan_chapters(titles: &[String], options: &ExportOptions) -> Vec<ChapterPlan> {
    plan_chapters_with_headings(titles, &[], options)
}

/// Like [`plan_chapters`], with each anchor named after the first heading the
/// chapter renders.
///
/// `None` (or a missing entry) means the chapter has no heading of its own,
/// so its title is rendered as the first heading.
pub fn plan_chapters_with_headings(
    titles: &[String],
    first_headings: &[Option<String>],
    options: &ExportOptions,
) -> Vec<ChapterPlan> {
    let width = ordinal_width(titles.len());
    let mut anchors = HashSet::new();

    titles
        .iter()
        .enumerate()
        .map(|(ordinal, title)| {
            let heading = first_headings
                .get(ordinal)
                .and_then(Option::as_deref)
                .unwrap_or(title);
            ChapterPlan {
                ordinal,
                title: title.clone(),
                file_name: chapter_file_name(&options.prefix, ordinal, width, &slugify(title), "md"),
                anchor: unique_anchor(&slugify(heading), &mut anchors),
            }
        })
        .collect()
}

/// One text document to write, path relative to the output directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDocument {
    pub path: String,
    pub contents: String,
}

/// Everything an export writes: documents plus the assets they reference
#[derive(Debug, Clone, Default)]
pub struct ExportBundle {
    pub documents: Vec<OutputDocument>,
    pub assets: Vec<Asset>,
}

/// Encoder for Markdown, as one document or one file per chapter
pub struct MarkdownEncoder {
    options: ExportOptions,
    single_file_name: String,
}

impl MarkdownEncoder {
    pub fn new(options: ExportOptions) -> Self {
        Self {
            options,
            single_file_name: "book.md".to_string(),
        }
    }

    /// File name of the document written in single mode
    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.single_file_name = name.into();
        self
    }

    /// Render the book into output documents, taking ownership of its assets
    pub fn render(&self, book: Book) -> ExportBundle {
        let documents = if self.options.is_split() {
            let mut docs = vec![OutputDocument {
                path: INDEX_FILE.to_string(),
                contents: self.render_index(&book),
            }];
            docs.extend(book.chapters.iter().map(|chapter| OutputDocument {
                path: chapter.file_name.clone(),
                contents: render_chapter(chapter),
            }));
            docs
        } else {
            vec![OutputDocument {
                path: self.single_file_name.clone(),
                contents: self.render_single(&book),
            }]
        };
        debug!("Rendered {} Markdown documents", documents.len());

        ExportBundle {
            documents,
            assets: book.assets,
        }
    }

    /// Header block, optional cover banner, title and the chapter list
    pub fn render_index(&self, book: &Book) -> String {
        let mut out = self.preamble(book);
        let mut writer = MarkdownWriter::new();
        writer.node(&Node::heading(1, book.title()));
        out.push_str(&writer.finish());

        out.push('\n');
        for chapter in &book.chapters {
            out.push_str(&format!(
                "- [{}]({})\n",
                escape_inline(&chapter.title),
                link_destination(&chapter.file_name)
            ));
        }
        out
    }

    /// Header block, optional cover banner, then every chapter separated by rules
    pub fn render_single(&self, book: &Book) -> String {
        let mut out = self.preamble(book);
        let bodies: Vec<String> = book.chapters.iter().map(render_chapter).collect();
        out.push_str(&bodies.join("\n---\n\n"));
        out
    }

    fn preamble(&self, book: &Book) -> String {
        let cover = book.cover().map(|c| c.output_path.clone());
        let front = FrontMatter {
            title: Some(book.metadata.title.clone()),
            authors: book.metadata.creator.clone(),
            description: book.metadata.description.clone(),
            language: Some(book.metadata.language.clone()),
            cover: cover.clone(),
        };

        let mut out = render_front_matter(&front);
        out.push('\n');
        if let Some(cover) = cover.filter(|_| self.options.cover_banner) {
            let mut writer = MarkdownWriter::new();
            writer.node(&Node::image(cover, ""));
            out.push_str(&writer.finish());
            out.push('\n');
        }
        out
    }
}

/// Markdown for one chapter; a level-1 heading with the title is added when
/// the body has none
pub fn render_chapter(chapter: &Chapter) -> String {
    let mut writer = MarkdownWriter::new();
    if !chapter.has_heading() {
        writer.node(&Node::heading(1, chapter.title.as_str()));
    }
    for node in &chapter.content {
        writer.node(node);
    }
    writer.finish()
}

/// Render a node sequence as Markdown
pub fn render_nodes(nodes: &[Node]) -> String {
    let mut writer = MarkdownWriter::new();
    for node in nodes {
        writer.node(node);
    }
    writer.finish()
}

struct MarkdownWriter {
    out: String,
}

impl MarkdownWriter {
    fn new() -> Self {
        Self { out: String::new() }
    }

    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn blank_line(&mut self) {
        if self.out.is_empty() {
            return;
        }
        while !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::Text(text) => {
                let text = if self.at_line_start() { text.trim_start() } else { text };
                if text.is_empty() {
                    return;
                }
                let escaped = escape_inline(text);
                if self.at_line_start() {
                    self.out.push_str(&escape_line_start(&escaped));
                } else {
                    self.out.push_str(&escaped);
                }
            }
            Node::Heading { level, text } => {
                self.blank_line();
                let hashes = "#".repeat(usize::from((*level).clamp(1, 6)));
                self.out.push_str(&format!("{hashes} {}\n\n", escape_heading(text)));
            }
            Node::ParagraphBreak => self.blank_line(),
            Node::LineBreak => {
                if !self.at_line_start() {
                    self.out.push_str("\\\n");
                }
            }
            Node::SectionBreak => {
                self.blank_line();
                self.out.push_str("---\n\n");
            }
            Node::Link { target, label } => {
                self.out.push_str(&format!(
                    "[{}]({})",
                    escape_inline(label),
                    link_destination(target)
                ));
            }
            Node::Image { target, alt } => {
                self.out.push_str(&format!(
                    "![{}]({})",
                    escape_inline(alt),
                    link_destination(target)
                ));
            }
        }
    }

    fn finish(self) -> String {
        let trimmed = self.out.trim_end_matches(['\n', ' ']);
        let trimmed = trimmed.strip_suffix('\\').unwrap_or(trimmed);
        if trimmed.is_empty() {
            String::new()
        } else {
            format!("{trimmed}\n")
        }
    }
}

/// Backslash-escape characters with inline meaning
fn escape_inline(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '`' | '*' | '_' | '[' | ']' | '<' | '>' | '&' | '~' | '|') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a character that would open a block construct at the start of a line
fn escape_line_start(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(c @ ('#' | '-' | '+' | '=')) => format!("\\{c}{}", chars.as_str()),
        Some(c) if c.is_ascii_digit() => {
            let digits = text.chars().take_while(char::is_ascii_digit).count();
            let rest = &text[digits..];
            if rest.starts_with('.') || rest.starts_with(')') {
                format!("{}\\{}", &text[..digits], rest)
            } else {
                text.to_string()
            }
        }
        _ => text.to_string(),
    }
}

/// Heading text: inline escapes plus every `#`
fn escape_heading(text: &str) -> String {
    escape_inline(text).replace('#', "\\#")
}

/// Link destination, wrapped in angle brackets when it holds spaces or parentheses
fn link_destination(target: &str) -> String {
    if target.contains([' ', '(', ')']) {
        format!("<{}>", target.replace('<', "%3C").replace('>', "%3E"))
    } else {
        target.to_string()
    }
}
