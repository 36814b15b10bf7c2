//! Slugs and output file names

use std::collections::HashSet;

/// Longest slug emitted, in characters
pub const MAX_SLUG_LEN: usize = 60;

/// Slug used when a title has no alphanumeric characters
pub const FALLBACK_SLUG: &str = "section";

/// Turn a title into a file-name-safe slug.
///
/// Lower-cases, collapses every run of non-alphanumeric characters into a
/// single hyphen, trims hyphens at both ends and truncates to
/// [`MAX_SLUG_LEN`] characters. Applying it twice gives the same result.
///
/// ```
/// use folio_core::naming::slugify;
///
/// assert_eq!(slugify("Chapter One"), "chapter-one");
/// assert_eq!(slugify("  Hello, World!  "), "hello-world");
/// assert_eq!(slugify("???"), "section");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_alphanumeric() {
            for lower in c.to_lowercase().filter(|l| l.is_alphanumeric()) {
                if pending_hyphen && !slug.is_empty() {
                    slug.push('-');
                }
                pending_hyphen = false;
                slug.push(lower);
            }
        } else {
            pending_hyphen = true;
        }
    }

    let truncated: String = slug.chars().take(MAX_SLUG_LEN).collect();
    let trimmed = truncated.trim_matches('-');
    if trimmed.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Zero-pad width for ordinals: at least two digits
pub fn ordinal_width(count: usize) -> usize {
    count.max(1).to_string().len().max(2)
}

/// `<prefix>-<NN>-<slug>.<ext>` with a 1-based ordinal.
///
/// An empty prefix drops the leading `<prefix>-`.
pub fn chapter_file_name(prefix: &str, ordinal: usize, width: usize, slug: &str, ext: &str) -> String {
    let number = format!("{:0width$}", ordinal + 1, width = width);
    if prefix.is_empty() {
        format!("{number}-{slug}.{ext}")
    } else {
        format!("{prefix}-{number}-{slug}.{ext}")
    }
}

/// Replace characters other than ASCII alphanumerics, `.`, `-`, `_` with `_`
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "asset".to_string()
    } else {
        cleaned
    }
}

/// Claim `name` in `taken`, appending `_1`, `_2`, ... before the extension on collision
pub fn unique_file_name(name: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(name.to_string()) {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(i) if i > 0 => (&name[..i], &name[i..]),
        _ => (name, ""),
    };
    let mut counter = 1;
    loop {
        let candidate = format!("{stem}_{counter}{ext}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}

/// Claim `anchor` in `taken`, appending `-1`, `-2`, ... on collision
pub fn unique_anchor(anchor: &str, taken: &mut HashSet<String>) -> String {
    if taken.insert(anchor.to_string()) {
        return anchor.to_string();
    }
    let mut counter = 1;
    loop {
        let candidate = format!("{anchor}-{counter}");
        if taken.insert(candidate.clone()) {
            return candidate;
        }
        counter += 1;
    }
}
