//! Media type detection and classification

use std::path::Path;

pub const XHTML: &str = "application/xhtml+xml";
pub const NCX: &str = "application/x-dtbncx+xml";
pub const CSS: &str = "text/css";

/// Media type for a file extension
pub fn mime_from_extension(ext: &str) -> &'static str {
    match ext.to_ascii_lowercase().as_str() {
        "xhtml" | "xhtm" => XHTML,
        "html" | "htm" => "text/html",
        "css" => CSS,
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "ttf" => "font/ttf",
        "otf" => "font/otf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "ncx" => NCX,
        "opf" => "application/oebps-package+xml",
        "xml" => "application/xml",
        "md" | "markdown" => "text/markdown",
        "txt" => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Media type for a path, by extension
pub fn mime_from_path(path: impl AsRef<Path>) -> &'static str {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(mime_from_extension)
        .unwrap_or("application/octet-stream")
}

/// Standard file extension for a media type
pub fn extension_from_mime(mime: &str) -> Option<&'static str> {
    let ext = match mime.to_ascii_lowercase().as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/svg+xml" => "svg",
        "image/webp" => "webp",
        "image/avif" => "avif",
        "font/ttf" | "application/x-font-ttf" => "ttf",
        "font/otf" | "application/x-font-opentype" | "application/vnd.ms-opentype" => "otf",
        "font/woff" | "application/font-woff" => "woff",
        "font/woff2" => "woff2",
        "audio/mpeg" => "mp3",
        "audio/mp4" => "m4a",
        "application/xhtml+xml" => "xhtml",
        "text/html" => "html",
        "text/css" => "css",
        _ => return None,
    };
    Some(ext)
}

/// XHTML or HTML: the only items that become chapters
pub fn is_content_document(mime: &str) -> bool {
    matches!(
        mime.to_ascii_lowercase().as_str(),
        "application/xhtml+xml" | "text/html"
    )
}

/// Images, SVG included
pub fn is_image(mime: &str) -> bool {
    mime.to_ascii_lowercase().starts_with("image/")
}

/// Text-based formats that are never treated as binary assets
pub fn is_text_mime(mime: &str) -> bool {
    let mime = mime.to_ascii_lowercase();
    if mime == "image/svg+xml" {
        return false;
    }
    mime.starts_with("text/")
        || mime == XHTML
        || mime == NCX
        || mime == "application/xml"
        || mime == "application/oebps-package+xml"
        || mime == "application/javascript"
        || mime == "application/json"
        || mime == "application/smil+xml"
}

/// Formats whose bytes are already compressed and should be stored as-is
pub fn is_precompressed(mime: &str) -> bool {
    matches!(
        mime.to_ascii_lowercase().as_str(),
        "image/png" | "image/jpeg" | "image/jpg" | "image/gif" | "image/webp"
    )
}
