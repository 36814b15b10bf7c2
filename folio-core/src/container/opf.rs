//! Package document (OPF) parsing

use crate::error::StructureError;
use crate::href::{parent_dir, resolve_href};
use crate::media;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::fmt::Display;

/// Parsed package document
#[derive(Debug, Clone, Default)]
pub struct Package {
    /// Archive path of the OPF itself
    pub path: String,
    pub metadata: PackageMetadata,
    /// Items in declaration order
    pub manifest: Vec<ManifestItem>,
    pub spine: Vec<SpineEntry>,
}

/// Dublin Core fields and cover marker from `<metadata>`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PackageMetadata {
    pub title: Option<String>,
    pub creators: Vec<String>,
    pub language: Option<String>,
    pub description: Option<String>,
    pub identifier: Option<String>,
    /// Manifest id named by `<meta name="cover" content="...">`
    pub cover_id: Option<String>,
}

/// One `<item>` from the manifest
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestItem {
    pub id: String,
    /// The href exactly as declared
    pub href: String,
    /// Archive path, resolved against the OPF directory
    pub path: String,
    pub media_type: String,
    pub properties: Vec<String>,
}

impl ManifestItem {
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p == name)
    }

    /// The EPUB 3 navigation document
    pub fn is_nav(&self) -> bool {
        self.has_property("nav")
    }
}

/// One `<itemref>` from the spine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineEntry {
    pub idref: String,
    pub linear: bool,
}

impl Package {
    /// Look up a manifest item by id
    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.id == id)
    }

    /// Look up a manifest item by resolved archive path
    pub fn item_by_path(&self, path: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.path == path)
    }

    /// Parse an OPF document located at `path` inside the archive
    pub fn parse(path: &str, xml: &str) -> Result<Package, StructureError> {
        let base_dir = parent_dir(path);
        let err = |e: &dyn Display| StructureError::MalformedXml {
            path: path.to_string(),
            message: e.to_string(),
        };

        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut package = Package {
            path: path.to_string(),
            ..Package::default()
        };
        let mut in_metadata = false;
        let mut field: Option<DcField> = None;
        let mut text = String::new();

        loop {
            let event = reader.read_event().map_err(|e| err(&e))?;
            match &event {
                Event::Start(e) | Event::Empty(e) => {
                    let is_start = matches!(event, Event::Start(_));
                    match e.local_name().as_ref() {
                        b"metadata" => in_metadata = is_start,
                        b"title" if in_metadata && is_start => field = Some(DcField::Title),
                        b"creator" if in_metadata && is_start => field = Some(DcField::Creator),
                        b"language" if in_metadata && is_start => field = Some(DcField::Language),
                        b"description" if in_metadata && is_start => {
                            field = Some(DcField::Description)
                        }
                        b"identifier" if in_metadata && is_start => {
                            field = Some(DcField::Identifier)
                        }
                        b"meta" if in_metadata => {
                            let name = attr(e, b"name").map_err(|e| err(&e))?;
                            if name.is_some_and(|n| n.eq_ignore_ascii_case("cover")) {
                                package.metadata.cover_id =
                                    attr(e, b"content").map_err(|e| err(&e))?;
                            }
                        }
                        b"item" => {
                            if let Some(item) = manifest_item(e, base_dir).map_err(|e| err(&e))? {
                                package.manifest.push(item);
                            }
                        }
                        b"itemref" => {
                            if let Some(idref) = attr(e, b"idref").map_err(|e| err(&e))? {
                                let linear = attr(e, b"linear").map_err(|e| err(&e))?;
                                package.spine.push(SpineEntry {
                                    idref,
                                    linear: linear.as_deref() != Some("no"),
                                });
                            }
                        }
                        _ => {}
                    }
                    text.clear();
                }
                Event::Text(t) => {
                    if field.is_some() {
                        text.push_str(&t.unescape().map_err(|e| err(&e))?);
                    }
                }
                Event::CData(t) => {
                    if field.is_some() {
                        text.push_str(&String::from_utf8_lossy(t.as_ref()));
                    }
                }
                Event::End(e) => {
                    if e.local_name().as_ref() == b"metadata" {
                        in_metadata = false;
                    }
                    if let Some(f) = field.take() {
                        let value = text.trim().to_string();
                        if !value.is_empty() {
                            package.metadata.set(f, value);
                        }
                    }
                    text.clear();
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(package)
    }
}

#[derive(Debug, Clone, Copy)]
enum DcField {
    Title,
    Creator,
    Language,
    Description,
    Identifier,
}

impl PackageMetadata {
    fn set(&mut self, field: DcField, value: String) {
        match field {
            DcField::Title => {
                self.title.get_or_insert(value);
            }
            DcField::Creator => self.creators.push(value),
            DcField::Language => {
                self.language.get_or_insert(value);
            }
            DcField::Description => {
                self.description.get_or_insert(value);
            }
            DcField::Identifier => {
                self.identifier.get_or_insert(value);
            }
        }
    }
}

fn manifest_item(
    e: &BytesStart,
    base_dir: &str,
) -> Result<Option<ManifestItem>, quick_xml::Error> {
    let (Some(id), Some(href)) = (attr(e, b"id")?, attr(e, b"href")?) else {
        return Ok(None);
    };
    let path = resolve_href(base_dir, &href);
    let media_type = match attr(e, b"media-type")? {
        Some(m) if !m.is_empty() => m,
        _ => media::mime_from_path(&path).to_string(),
    };
    let properties = attr(e, b"properties")?
        .map(|p| p.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();

    Ok(Some(ManifestItem {
        id,
        href,
        path,
        media_type,
        properties,
    }))
}

/// Unescaped value of the attribute with the given local name
pub(crate) fn attr(e: &BytesStart, name: &[u8]) -> Result<Option<String>, quick_xml::Error> {
    for a in e.attributes() {
        let a = a.map_err(quick_xml::Error::InvalidAttr)?;
        if a.key.local_name().as_ref() == name {
            return Ok(Some(a.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="3.0" unique-identifier="uid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:identifier id="uid">urn:isbn:123</dc:identifier>
    <dc:title>The &amp; Book</dc:title>
    <dc:creator>Ann</dc:creator>
    <dc:creator>Bob</dc:creator>
    <dc:language>fr</dc:language>
    <meta name="cover" content="img-cover"/>
  </metadata>
  <manifest>
    <item id="c1" href="text/c1.xhtml" media-type="application/xhtml+xml"/>
    <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
    <item id="img-cover" href="images/My%20Cover.png" media-type="image/png"/>
    <item id="css" href="style.css"/>
  </manifest>
  <spine>
    <itemref idref="c1"/>
    <itemref idref="nav" linear="no"/>
  </spine>
</package>"#;

    #[test]
    fn test_parse_package() {
        let package = Package::parse("OEBPS/content.opf", OPF).unwrap();

        assert_eq!(package.metadata.title.as_deref(), Some("The & Book"));
        assert_eq!(package.metadata.creators, vec!["Ann", "Bob"]);
        assert_eq!(package.metadata.language.as_deref(), Some("fr"));
        assert_eq!(package.metadata.identifier.as_deref(), Some("urn:isbn:123"));
        assert_eq!(package.metadata.cover_id.as_deref(), Some("img-cover"));

        let ids: Vec<_> = package.manifest.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "nav", "img-cover", "css"]);
        assert_eq!(package.manifest[0].path, "OEBPS/text/c1.xhtml");
        assert_eq!(package.manifest[2].path, "OEBPS/images/My Cover.png");
        assert!(package.manifest[1].is_nav());
        assert_eq!(package.manifest[3].media_type, "text/css");

        assert_eq!(package.spine.len(), 2);
        assert!(package.spine[0].linear);
        assert!(!package.spine[1].linear);
    }

    #[test]
    fn test_item_lookup() {
        let package = Package::parse("content.opf", OPF).unwrap();
        assert_eq!(package.item("c1").unwrap().path, "text/c1.xhtml");
        assert_eq!(package.item_by_path("nav.xhtml").unwrap().id, "nav");
        assert!(package.item("missing").is_none());
    }

    #[test]
    fn test_malformed_package() {
        let result = Package::parse("content.opf", "<package><manifest></spine></package>");
        assert!(matches!(result, Err(StructureError::MalformedXml { .. })));
    }
}
