//! Reference (href/src) resolution helpers

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;

static SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:").expect("valid scheme regex"));

/// Whether a target carries a URI scheme (`http:`, `mailto:`, `data:`, ...)
pub fn is_external(target: &str) -> bool {
    target.starts_with("//") || SCHEME.is_match(target)
}

/// Split `path#fragment` into its two halves; the fragment excludes `#`
pub fn split_fragment(target: &str) -> (&str, Option<&str>) {
    match target.split_once('#') {
        Some((path, frag)) => (path, Some(frag)),
        None => (target, None),
    }
}

/// Directory component of an archive path (no trailing slash)
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(i) => &path[..i],
        None => "",
    }
}

/// Percent-decode a reference, keeping the input on invalid UTF-8
pub fn decode(target: &str) -> String {
    percent_decode_str(target)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| target.to_string())
}

/// Resolve a relative href against a base directory.
///
/// `.` and empty segments are dropped, `..` pops a segment (never above the
/// root), and a leading `/` makes the href root-relative.
pub fn resolve_href(base_dir: &str, href: &str) -> String {
    let href = decode(href);
    if let Some(stripped) = href.strip_prefix('/') {
        return normalize(stripped);
    }

    let mut parts: Vec<&str> = base_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in href.split('/') {
        match segment {
            ".." => {
                parts.pop();
            }
            "." | "" => {}
            s => parts.push(s),
        }
    }
    parts.join("/")
}

fn normalize(path: &str) -> String {
    resolve_href("", path)
}

/// Join a filesystem reference onto a base directory.
///
/// Unlike [`resolve_href`], `..` segments that climb above the base are kept
/// and an absolute reference stays absolute.
pub fn join_path(base_dir: &str, href: &str) -> String {
    let href = decode(href);
    let absolute = href.starts_with('/');
    let base = if absolute { "" } else { base_dir };

    let mut parts: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(href.split('/')) {
        match segment {
            "." | "" => {}
            ".." => match parts.last() {
                Some(&last) if last != ".." => {
                    parts.pop();
                }
                _ if absolute => {}
                _ => parts.push(".."),
            },
            s => parts.push(s),
        }
    }

    let joined = parts.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}
