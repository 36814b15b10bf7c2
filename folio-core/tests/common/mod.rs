//! In-memory EPUB fixtures for integration tests

#![allow(dead_code)]

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Smallest byte sequence that identifies as PNG
pub const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0, 0, 0];

/// Smallest byte sequence that identifies as JPEG
pub const JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0, 0x10, b'J', b'F', b'I', b'F'];

struct Item {
    id: String,
    href: String,
    media_type: String,
    properties: Option<String>,
    data: Vec<u8>,
}

/// Builder for a small EPUB package rooted at `OEBPS/content.opf`
pub struct EpubFixture {
    title: Option<String>,
    creators: Vec<String>,
    language: Option<String>,
    cover_meta: Option<String>,
    items: Vec<Item>,
    spine: Vec<String>,
}

impl EpubFixture {
    pub fn new(title: &str) -> Self {
        Self {
            title: Some(title.to_string()),
            creators: Vec::new(),
            language: Some("en".to_string()),
            cover_meta: None,
            items: Vec::new(),
            spine: Vec::new(),
        }
    }

    pub fn without_title(mut self) -> Self {
        self.title = None;
        self
    }

    pub fn creator(mut self, name: &str) -> Self {
        self.creators.push(name.to_string());
        self
    }

    /// Add a content document to the manifest and the spine
    pub fn chapter(mut self, id: &str, href: &str, body: &str) -> Self {
        self.items.push(Item {
            id: id.to_string(),
            href: href.to_string(),
            media_type: "application/xhtml+xml".to_string(),
            properties: None,
            data: xhtml(id, body).into_bytes(),
        });
        self.spine.push(id.to_string());
        self
    }

    /// Add a non-spine resource to the manifest
    pub fn resource(mut self, id: &str, href: &str, media_type: &str, data: &[u8]) -> Self {
        self.items.push(Item {
            id: id.to_string(),
            href: href.to_string(),
            media_type: media_type.to_string(),
            properties: None,
            data: data.to_vec(),
        });
        self
    }

    /// Flag the most recently added item with a manifest `properties` value
    pub fn properties(mut self, properties: &str) -> Self {
        if let Some(item) = self.items.last_mut() {
            item.properties = Some(properties.to_string());
        }
        self
    }

    /// Declare a cover through `<meta name="cover">`
    pub fn cover_meta(mut self, id: &str) -> Self {
        self.cover_meta = Some(id.to_string());
        self
    }

    fn opf(&self) -> String {
        let mut opf = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <package xmlns=\"http://www.idpf.org/2007/opf\" version=\"3.0\" unique-identifier=\"uid\">\n\
             <metadata xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n\
             <dc:identifier id=\"uid\">urn:uuid:00000000-0000-4000-8000-000000000000</dc:identifier>\n",
        );
        if let Some(title) = &self.title {
            opf.push_str(&format!("<dc:title>{title}</dc:title>\n"));
        }
        for creator in &self.creators {
            opf.push_str(&format!("<dc:creator>{creator}</dc:creator>\n"));
        }
        if let Some(language) = &self.language {
            opf.push_str(&format!("<dc:language>{language}</dc:language>\n"));
        }
        if let Some(cover) = &self.cover_meta {
            opf.push_str(&format!("<meta name=\"cover\" content=\"{cover}\"/>\n"));
        }
        opf.push_str("</metadata>\n<manifest>\n");
        for item in &self.items {
            let properties = item
                .properties
                .as_ref()
                .map(|p| format!(" properties=\"{p}\""))
                .unwrap_or_default();
            opf.push_str(&format!(
                "<item id=\"{}\" href=\"{}\" media-type=\"{}\"{properties}/>\n",
                item.id, item.href, item.media_type
            ));
        }
        opf.push_str("</manifest>\n<spine>\n");
        for idref in &self.spine {
            opf.push_str(&format!("<itemref idref=\"{idref}\"/>\n"));
        }
        opf.push_str("</spine>\n</package>\n");
        opf
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);

        zip.start_file("mimetype", stored).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();

        zip.start_file("META-INF/container.xml", stored).unwrap();
        zip.write_all(
            br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
        )
        .unwrap();

        zip.start_file("OEBPS/content.opf", stored).unwrap();
        zip.write_all(self.opf().as_bytes()).unwrap();

        for item in &self.items {
            zip.start_file(format!("OEBPS/{}", item.href), stored).unwrap();
            zip.write_all(&item.data).unwrap();
        }

        zip.finish().unwrap().into_inner()
    }

    /// Write the package to `path`
    pub fn write_to(&self, path: &std::path::Path) {
        std::fs::write(path, self.build()).unwrap();
    }
}

/// Wrap body markup in an XHTML document
pub fn xhtml(title: &str, body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <html xmlns=\"http://www.w3.org/1999/xhtml\">\n\
         <head><title>{title}</title></head>\n\
         <body>\n{body}\n</body>\n</html>\n"
    )
}

/// Three chapters with a declared cover and an inline image
pub fn three_chapter_book() -> EpubFixture {
    EpubFixture::new("Sample Book")
        .creator("Jane Doe")
        .chapter(
            "c1",
            "text/preface.xhtml",
            r#"<h1>Preface</h1><p>Read <a href="chapter1.xhtml#start">on</a>.</p>"#,
        )
        .chapter(
            "c2",
            "text/chapter1.xhtml",
            r#"<h1 id="start">Chapter One</h1><p>It began.</p><p><img src="../images/map.png" alt="Map"/></p>"#,
        )
        .chapter(
            "c3",
            "text/chapter2.xhtml",
            "<h1>Chapter Two</h1><p>It ended.</p>",
        )
        .resource("map", "images/map.png", "image/png", PNG)
        .resource("front", "images/front.png", "image/png", PNG)
        .properties("cover-image")
}
