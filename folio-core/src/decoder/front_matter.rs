//! Leading YAML header block of a Markdown document

use crate::error::MetadataParseError;
use serde_yml::Value;
use tracing::warn;

/// Values recognized in a header block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub language: Option<String>,
    pub cover: Option<String>,
}

/// Split a document into its header block and body.
///
/// A header starts with a `---` line on the first line and ends with a `---`
/// or `...` line. Returns `None` when there is no header at all. An
/// unterminated header yields the error and the whole text as body.
pub fn split_front_matter(text: &str) -> (Option<Result<FrontMatter, MetadataParseError>>, &str) {
    let text = text.trim_start_matches('\u{feff}');
    let mut lines = text.split_inclusive('\n');

    match lines.next() {
        Some(first) if first.trim_end() == "---" => {}
        _ => return (None, text),
    }

    let mut offset = text.split_inclusive('\n').next().map_or(0, str::len);
    let header_start = offset;
    for line in lines {
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            let header = &text[header_start..offset];
            let body = &text[offset + line.len()..];
            return (Some(parse_front_matter(header)), body);
        }
        offset += line.len();
    }

    (Some(Err(MetadataParseError::Unterminated)), text)
}

/// Parse the YAML between the delimiters.
///
/// Keys are matched case-insensitively; `author` may be a string or a list.
pub fn parse_front_matter(yaml: &str) -> Result<FrontMatter, MetadataParseError> {
    if yaml.trim().is_empty() {
        return Ok(FrontMatter::default());
    }

    let value: Value =
        serde_yml::from_str(yaml).map_err(|e| MetadataParseError::Invalid(e.to_string()))?;
    let mapping = match value {
        Value::Mapping(m) => m,
        Value::Null => return Ok(FrontMatter::default()),
        other => {
            return Err(MetadataParseError::Invalid(format!(
                "expected key-value pairs, found {}",
                kind(&other)
            )))
        }
    };

    let mut front = FrontMatter::default();
    for (key, value) in mapping {
        let Some(key) = scalar(&key) else {
            continue;
        };
        match key.to_ascii_lowercase().as_str() {
            "title" => front.title = scalar(&value),
            "author" | "authors" | "creator" => front.authors = list(&value),
            "description" => front.description = scalar(&value),
            "language" | "lang" => front.language = scalar(&value),
            "cover" | "cover-image" | "cover_image" => front.cover = scalar(&value),
            _ => {}
        }
    }
    Ok(front)
}

fn scalar(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

fn list(value: &Value) -> Vec<String> {
    match value {
        Value::Sequence(items) => items.iter().filter_map(scalar).collect(),
        other => scalar(other).into_iter().collect(),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Sequence(_) => "a list",
        Value::String(_) => "a string",
        Value::Number(_) => "a number",
        Value::Bool(_) => "a boolean",
        _ => "an unsupported value",
    }
}

/// Render a header block (delimiters included) for the given values
pub fn render_front_matter(front: &FrontMatter) -> String {
    let mut mapping = serde_yml::Mapping::new();
    let mut put = |key: &str, value: Value| {
        mapping.insert(Value::String(key.to_string()), value);
    };
    if let Some(title) = &front.title {
        put("title", Value::String(title.clone()));
    }
    match front.authors.as_slice() {
        [] => {}
        [one] => put("author", Value::String(one.clone())),
        many => put(
            "author",
            Value::Sequence(many.iter().cloned().map(Value::String).collect()),
        ),
    }
    if let Some(language) = &front.language {
        put("language", Value::String(language.clone()));
    }
    if let Some(description) = &front.description {
        put("description", Value::String(description.clone()));
    }
    if let Some(cover) = &front.cover {
        put("cover", Value::String(cover.clone()));
    }

    let yaml = if mapping.is_empty() {
        String::new()
    } else {
        match serde_yml::to_string(&Value::Mapping(mapping)) {
            Ok(yaml) => yaml,
            Err(e) => {
                warn!("Writing an empty header block: {}", e);
                String::new()
            }
        }
    };
    let yaml = yaml.trim_start_matches("---\n");

    let mut out = String::from("---\n");
    out.push_str(yaml);
    if !yaml.is_empty() && !yaml.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("---\n");
    out
}
