//! Segmenting a flat node sequence into chapters at heading boundaries

use crate::types::Node;

/// A chapter cut out of a flat document, before naming
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    /// Level of the opening heading; `None` for a preamble or headingless document
    pub level: Option<u8>,
    pub content: Vec<Node>,
}

/// Top-most heading level present, if any
pub fn top_heading_level(nodes: &[Node]) -> Option<u8> {
    nodes
        .iter()
        .filter_map(|n| match n {
            Node::Heading { level, .. } => Some(*level),
            _ => None,
        })
        .min()
}

/// Split `nodes` at every heading whose level is at or above `boundary`.
///
/// `boundary` defaults to the top-most level present. Each section runs from
/// its heading (inclusive) to the next boundary heading. Content before the
/// first boundary becomes a section titled `book_title` when it holds
/// anything besides breaks. A document without headings is one section.
pub fn split_sections(nodes: Vec<Node>, boundary: Option<u8>, book_title: &str) -> Vec<Section> {
    let Some(boundary) = boundary.or_else(|| top_heading_level(&nodes)) else {
        return vec![Section {
            title: book_title.to_string(),
            level: None,
            content: nodes,
        }];
    };

    let mut sections = Vec::new();
    let mut current = Section {
        title: book_title.to_string(),
        level: None,
        content: Vec::new(),
    };

    for node in nodes {
        if let Node::Heading { level, text } = &node {
            if *level <= boundary {
                let next = Section {
                    title: text.clone(),
                    level: Some(*level),
                    content: Vec::new(),
                };
                let previous = std::mem::replace(&mut current, next);
                if previous.level.is_some() || previous.content.iter().any(Node::has_content) {
                    sections.push(previous);
                }
            }
        }
        current.content.push(node);
    }

    if current.level.is_some() || current.content.iter().any(Node::has_content) || sections.is_empty() {
        sections.push(current);
    }
    sections
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(sections: &[Section]) -> Vec<&str> {
        sections.iter().map(|s| s.title.as_str()).collect()
    }

    #[test]
    fn test_split_at_top_level() {
        let nodes = vec![
            Node::heading(1, "One"),
            Node::text("a"),
            Node::heading(2, "Sub"),
            Node::text("b"),
            Node::heading(1, "Two"),
            Node::text("c"),
        ];
        let sections = split_sections(nodes, None, "Book");
        assert_eq!(titles(&sections), vec!["One", "Two"]);
        assert_eq!(sections[0].content.len(), 4);
        assert_eq!(sections[1].level, Some(1));
    }

    #[test]
    fn test_explicit_boundary_includes_higher_levels() {
        let nodes = vec![
            Node::heading(1, "Part"),
            Node::heading(2, "A"),
            Node::text("a"),
            Node::heading(2, "B"),
            Node::heading(3, "B.1"),
        ];
        let sections = split_sections(nodes, Some(2), "Book");
        assert_eq!(titles(&sections), vec!["Part", "A", "B"]);
        // Adjacent boundary headings give a title-only section
        assert_eq!(sections[0].content, vec![Node::heading(1, "Part")]);
    }

    #[test]
    fn test_preamble() {
        let nodes = vec![Node::text("intro"), Node::ParagraphBreak, Node::heading(2, "X")];
        let sections = split_sections(nodes, None, "Book");
        assert_eq!(titles(&sections), vec!["Book", "X"]);
        assert_eq!(sections[0].level, None);

        let blank = vec![Node::ParagraphBreak, Node::heading(2, "X")];
        assert_eq!(titles(&split_sections(blank, None, "Book")), vec!["X"]);
    }

    #[test]
    fn test_no_headings() {
        let sections = split_sections(vec![Node::text("just text")], None, "Book");
        assert_eq!(titles(&sections), vec!["Book"]);
        assert_eq!(sections[0].content, vec![Node::text("just text")]);

        let empty = split_sections(Vec::new(), None, "Book");
        assert_eq!(empty.len(), 1);
        assert!(empty[0].content.is_empty());
    }

    #[test]
    fn test_boundary_deeper_than_any_heading_level() {
        let nodes = vec![Node::text("x"), Node::heading(1, "A")];
        let sections = split_sections(nodes, Some(3), "Book");
        assert_eq!(titles(&sections), vec!["Book", "A"]);
    }
}
