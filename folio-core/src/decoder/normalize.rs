//! XHTML content document → intermediate nodes

use crate::assets::RewriteMap;
use crate::error::UnresolvedReferenceError;
use crate::href::{is_external, parent_dir, resolve_href, split_fragment};
use crate::media;
use crate::types::{collapse_whitespace, push_paragraph_break, push_text, Node};
use ego_tree::NodeRef;
use scraper::node::Element;
use scraper::Html;

/// Elements whose content ends with a paragraph break
const BLOCK_ELEMENTS: &[&str] = &[
    "p", "div", "section", "article", "aside", "header", "footer", "nav", "main", "figure",
    "figcaption", "blockquote", "pre", "li", "ul", "ol", "dl", "dt", "dd", "table", "thead",
    "tbody", "tfoot", "tr", "caption", "address", "center", "hgroup", "body", "details",
    "summary",
];

/// Elements that are never rendered
const SKIPPED_ELEMENTS: &[&str] = &["head", "script", "style", "template", "noscript"];

/// Result of normalizing one content document
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedDocument {
    pub title: Option<String>,
    pub nodes: Vec<Node>,
}

/// Converts parsed XHTML into [`Node`]s, rewriting every internal target
/// through a finalized [`RewriteMap`]
pub struct Normalizer<'a> {
    map: &'a RewriteMap,
    rewrite_assets: bool,
}

impl<'a> Normalizer<'a> {
    pub fn new(map: &'a RewriteMap) -> Self {
        Self {
            map,
            rewrite_assets: true,
        }
    }

    /// When off, image targets and links to non-document resources are kept
    /// verbatim instead of being looked up in the map
    pub fn with_asset_rewriting(mut self, on: bool) -> Self {
        self.rewrite_assets = on;
        self
    }

    /// Normalize a parsed document located at `path` inside the archive
    pub fn normalize(
        &self,
        html: &Html,
        path: &str,
    ) -> Result<NormalizedDocument, UnresolvedReferenceError> {
        let mut walk = Walk {
            normalizer: self,
            document: path,
            base_dir: parent_dir(path),
            nodes: Vec::new(),
            preformatted: 0,
        };
        walk.children(html.tree.root())?;

        Ok(NormalizedDocument {
            title: document_title(html),
            nodes: tidy(walk.nodes),
        })
    }

    fn rewrite_link(&self, href: &str, ctx: &Walk) -> Result<String, UnresolvedReferenceError> {
        let href = href.trim();
        if is_external(href) || href.starts_with('#') {
            return Ok(href.to_string());
        }
        let (path, fragment) = split_fragment(href);
        let resolved = resolve_href(ctx.base_dir, path);

        match self.map.get(&resolved) {
            // Single mode targets are anchors; the source fragment no longer exists
            Some(target) if target.starts_with('#') => Ok(target.to_string()),
            Some(target) => Ok(match fragment {
                Some(f) if !f.is_empty() => format!("{target}#{f}"),
                _ => target.to_string(),
            }),
            None if !self.rewrite_assets
                && !media::is_content_document(media::mime_from_path(&resolved)) =>
            {
                Ok(href.to_string())
            }
            None => Err(ctx.unresolved(href)),
        }
    }

    fn rewrite_image(&self, src: &str, ctx: &Walk) -> Result<String, UnresolvedReferenceError> {
        let src = src.trim();
        if !self.rewrite_assets || is_external(src) {
            return Ok(src.to_string());
        }
        let (path, _) = split_fragment(src);
        let resolved = resolve_href(ctx.base_dir, path);
        self.map
            .get(&resolved)
            .map(str::to_string)
            .ok_or_else(|| ctx.unresolved(src))
    }
}

struct Walk<'n, 'a> {
    normalizer: &'n Normalizer<'a>,
    document: &'n str,
    base_dir: &'n str,
    nodes: Vec<Node>,
    preformatted: usize,
}

impl Walk<'_, '_> {
    fn unresolved(&self, reference: &str) -> UnresolvedReferenceError {
        UnresolvedReferenceError {
            reference: reference.to_string(),
            document: self.document.to_string(),
        }
    }

    fn children(&mut self, node: NodeRef<scraper::Node>) -> Result<(), UnresolvedReferenceError> {
        for child in node.children() {
            self.node(child)?;
        }
        Ok(())
    }

    fn node(&mut self, node: NodeRef<scraper::Node>) -> Result<(), UnresolvedReferenceError> {
        match node.value() {
            scraper::Node::Text(t) => {
                self.text(&**t);
                Ok(())
            }
            scraper::Node::Element(el) => self.element(el, node),
            scraper::Node::Document | scraper::Node::Fragment => self.children(node),
            _ => Ok(()),
        }
    }

    fn element(
        &mut self,
        element: &Element,
        node: NodeRef<scraper::Node>,
    ) -> Result<(), UnresolvedReferenceError> {
        let tag = element.name();

        match tag {
            t if SKIPPED_ELEMENTS.contains(&t) => Ok(()),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse::<u8>().unwrap_or(1);
                let text = collapse_whitespace(&text_content(node));
                push_paragraph_break(&mut self.nodes);
                if !text.is_empty() {
                    self.nodes.push(Node::heading(level, text));
                }
                // Images inside headings follow the heading
                self.images_in(node)?;
                Ok(())
            }
            "br" => {
                if !self.at_line_start() {
                    self.nodes.push(Node::LineBreak);
                }
                Ok(())
            }
            "hr" => {
                push_paragraph_break(&mut self.nodes);
                self.nodes.push(Node::SectionBreak);
                Ok(())
            }
            "img" => match element.attr("src") {
                Some(src) if !src.trim().is_empty() => self.image(src, element.attr("alt")),
                _ => Ok(()),
            },
            "image" => match href_attr(element) {
                Some(src) => self.image(src, None),
                None => Ok(()),
            },
            "a" => self.anchor(element, node),
            "pre" => {
                push_paragraph_break(&mut self.nodes);
                self.preformatted += 1;
                let result = self.children(node);
                self.preformatted -= 1;
                result?;
                push_paragraph_break(&mut self.nodes);
                Ok(())
            }
            "td" | "th" => {
                self.children(node)?;
                self.text(" ");
                Ok(())
            }
            t if BLOCK_ELEMENTS.contains(&t) => {
                push_paragraph_break(&mut self.nodes);
                self.children(node)?;
                push_paragraph_break(&mut self.nodes);
                Ok(())
            }
            _ => self.children(node),
        }
    }

    fn anchor(
        &mut self,
        element: &Element,
        node: NodeRef<scraper::Node>,
    ) -> Result<(), UnresolvedReferenceError> {
        let Some(href) = element.attr("href").filter(|h| !h.trim().is_empty()) else {
            return self.children(node);
        };
        if contains_image(node) {
            return self.children(node);
        }

        let target = self.normalizer.rewrite_link(href, self)?;
        let label = collapse_whitespace(&text_content(node));
        if label.is_empty() {
            return Ok(());
        }
        if self.ends_with_text_without_space() && starts_with_whitespace(&text_content(node)) {
            push_text(&mut self.nodes, " ");
        }
        self.nodes.push(Node::link(target, label));
        Ok(())
    }

    fn image(&mut self, src: &str, alt: Option<&str>) -> Result<(), UnresolvedReferenceError> {
        let target = self.normalizer.rewrite_image(src, self)?;
        let alt = alt.map(collapse_whitespace).unwrap_or_default();
        self.nodes.push(Node::image(target, alt));
        Ok(())
    }

    fn images_in(&mut self, node: NodeRef<scraper::Node>) -> Result<(), UnresolvedReferenceError> {
        for d in node.descendants().skip(1) {
            if let Some(el) = d.value().as_element() {
                match el.name() {
                    "img" => {
                        if let Some(src) = el.attr("src").filter(|s| !s.trim().is_empty()) {
                            self.image(src, el.attr("alt"))?;
                        }
                    }
                    "image" => {
                        if let Some(src) = href_attr(el) {
                            self.image(src, None)?;
                        }
                    }
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn text(&mut self, raw: &str) {
        if self.preformatted > 0 {
            let mut lines = raw.split('\n').peekable();
            while let Some(line) = lines.next() {
                push_text(&mut self.nodes, line.trim_end_matches('\r'));
                if lines.peek().is_some() {
                    self.nodes.push(Node::LineBreak);
                }
            }
            return;
        }

        let mut collapsed = String::with_capacity(raw.len());
        let mut in_space = false;
        for c in raw.chars() {
            if c.is_whitespace() {
                in_space = true;
            } else {
                if in_space {
                    collapsed.push(' ');
                }
                in_space = false;
                collapsed.push(c);
            }
        }
        if in_space {
            collapsed.push(' ');
        }

        let mut text = collapsed.as_str();
        if self.at_line_start() || self.ends_with_space() {
            text = text.trim_start();
        }
        push_text(&mut self.nodes, text);
    }

    fn at_line_start(&self) -> bool {
        matches!(
            self.nodes.last(),
            None | Some(Node::ParagraphBreak)
                | Some(Node::LineBreak)
                | Some(Node::SectionBreak)
                | Some(Node::Heading { .. })
        )
    }

    fn ends_with_space(&self) -> bool {
        matches!(self.nodes.last(), Some(Node::Text(t)) if t.ends_with(' '))
    }

    fn ends_with_text_without_space(&self) -> bool {
        matches!(self.nodes.last(), Some(Node::Text(t)) if !t.ends_with(' '))
    }
}

fn starts_with_whitespace(s: &str) -> bool {
    s.chars().next().is_some_and(char::is_whitespace)
}

/// `href` or `xlink:href`, matched by local name
fn href_attr(element: &Element) -> Option<&str> {
    element
        .attrs()
        .find(|(name, value)| *name == "href" && !value.trim().is_empty())
        .map(|(_, value)| value)
}

fn contains_image(node: NodeRef<scraper::Node>) -> bool {
    node.descendants().any(|d| {
        d.value()
            .as_element()
            .is_some_and(|el| matches!(el.name(), "img" | "image"))
    })
}

/// Concatenated descendant text, skipping non-rendered elements
fn text_content(node: NodeRef<scraper::Node>) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: NodeRef<scraper::Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            scraper::Node::Text(t) => out.push_str(t),
            scraper::Node::Element(el) if SKIPPED_ELEMENTS.contains(&el.name()) => {}
            scraper::Node::Element(el) if el.name() == "br" => out.push(' '),
            scraper::Node::Element(_) => collect_text(child, out),
            _ => {}
        }
    }
}

/// Trim text at block edges and drop empty runs and dangling breaks
fn tidy(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    let mut iter = nodes.into_iter().peekable();

    while let Some(node) = iter.next() {
        match node {
            Node::Text(mut text) => {
                let next_is_edge = match iter.peek() {
                    None => true,
                    Some(n) => n.is_break() || matches!(n, Node::Heading { .. }),
                };
                if next_is_edge {
                    text.truncate(text.trim_end().len());
                }
                if !text.is_empty() {
                    out.push(Node::Text(text));
                }
            }
            Node::ParagraphBreak => push_paragraph_break(&mut out),
            Node::LineBreak => {
                if matches!(out.last(), Some(n) if !n.is_break() && !matches!(n, Node::Heading { .. })) {
                    out.push(Node::LineBreak);
                }
            }
            other => out.push(other),
        }
    }

    while matches!(out.last(), Some(Node::ParagraphBreak) | Some(Node::LineBreak)) {
        out.pop();
    }
    out
}

/// Title of a content document.
///
/// The first `h1`, else `<title>`, else the first `h2`-`h6`.
pub fn document_title(html: &Html) -> Option<String> {
    let mut title_element = None;
    let mut first_subheading = None;

    for node in html.tree.root().descendants() {
        let Some(el) = node.value().as_element() else {
            continue;
        };
        match el.name() {
            "h1" => {
                let text = collapse_whitespace(&text_content(node));
                if !text.is_empty() {
                    return Some(text);
                }
            }
            "title" if title_element.is_none() => {
                let text = collapse_whitespace(&text_content(node));
                if !text.is_empty() {
                    title_element = Some(text);
                }
            }
            "h2" | "h3" | "h4" | "h5" | "h6" if first_subheading.is_none() => {
                let text = collapse_whitespace(&text_content(node));
                if !text.is_empty() {
                    first_subheading = Some(text);
                }
            }
            _ => {}
        }
    }
    title_element.or(first_subheading)
}

/// Text of the first heading a document renders, in document order
pub fn first_heading(html: &Html) -> Option<String> {
    find_heading(html.tree.root())
}

fn find_heading(node: NodeRef<scraper::Node>) -> Option<String> {
    node.children().find_map(|child| {
        let el = child.value().as_element()?;
        match el.name() {
            t if SKIPPED_ELEMENTS.contains(&t) => None,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                Some(collapse_whitespace(&text_content(child))).filter(|t| !t.is_empty())
            }
            _ => find_heading(child),
        }
    })
}

/// Archive paths of every internal image the document references, in order
pub fn image_references(html: &Html, path: &str) -> Vec<String> {
    let base_dir = parent_dir(path);
    html.tree
        .root()
        .descendants()
        .filter_map(|node| {
            let el = node.value().as_element()?;
            let src = match el.name() {
                "img" => el.attr("src"),
                "image" => href_attr(el),
                _ => None,
            }?;
            let src = src.trim();
            if src.is_empty() || is_external(src) {
                return None;
            }
            Some(resolve_href(base_dir, split_fragment(src).0))
        })
        .collect()
}
