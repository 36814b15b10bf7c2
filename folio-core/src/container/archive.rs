//! Zip container access

use super::opf::{attr, Package};
use crate::assets::AssetSource;
use crate::error::{AssetReadError, StructureError};
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

pub const CONTAINER_PATH: &str = "META-INF/container.xml";
const PACKAGE_MEDIA_TYPE: &str = "application/oebps-package+xml";

/// An EPUB archive held in memory
pub struct EpubArchive {
    zip: ZipArchive<Cursor<Vec<u8>>>,
}

impl EpubArchive {
    /// Open an archive from its raw bytes
    pub fn from_bytes(data: Vec<u8>) -> Result<Self, StructureError> {
        let zip = ZipArchive::new(Cursor::new(data))
            .map_err(|e| StructureError::InvalidArchive(e.to_string()))?;
        Ok(Self { zip })
    }

    /// Read a whole stream and open it as an archive
    pub fn from_reader(reader: &mut dyn Read) -> crate::Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(Self::from_bytes(data)?)
    }

    /// Entry names in archive order
    pub fn entry_names(&mut self) -> Vec<String> {
        (0..self.zip.len())
            .filter_map(|i| self.zip.by_index(i).ok().map(|f| f.name().to_string()))
            .collect()
    }

    /// Raw bytes of an entry
    pub fn read_bytes(&mut self, path: &str) -> Result<Vec<u8>, StructureError> {
        let mut file = self.zip.by_name(path).map_err(|e| match e {
            ZipError::FileNotFound => StructureError::MissingEntry(path.to_string()),
            other => StructureError::InvalidArchive(other.to_string()),
        })?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)
            .map_err(|e| StructureError::InvalidArchive(format!("{path}: {e}")))?;
        Ok(data)
    }

    /// An entry decoded as UTF-8 text, byte order mark removed
    pub fn read_string(&mut self, path: &str) -> Result<String, StructureError> {
        let data = self.read_bytes(path)?;
        let text = String::from_utf8_lossy(&data);
        Ok(text.trim_start_matches('\u{feff}').to_string())
    }

    /// Locate the package document.
    ///
    /// Uses `META-INF/container.xml` when present; otherwise the first
    /// `.opf` entry in archive order.
    pub fn package_path(&mut self) -> Result<String, StructureError> {
        match self.read_string(CONTAINER_PATH) {
            Ok(xml) => parse_container(&xml)?.ok_or(StructureError::NoRootfile),
            Err(StructureError::MissingEntry(_)) => {
                let fallback = self
                    .entry_names()
                    .into_iter()
                    .find(|name| name.to_ascii_lowercase().ends_with(".opf"));
                match fallback {
                    Some(path) => {
                        warn!("{} missing, using package document {}", CONTAINER_PATH, path);
                        Ok(path)
                    }
                    None => Err(StructureError::MissingEntry(CONTAINER_PATH.to_string())),
                }
            }
            Err(e) => Err(e),
        }
    }

    /// Locate and parse the package document
    pub fn read_package(&mut self) -> Result<Package, StructureError> {
        let path = self.package_path()?;
        debug!("Reading package document {}", path);
        let xml = self.read_string(&path)?;
        Package::parse(&path, &xml)
    }
}

impl AssetSource for EpubArchive {
    fn read_asset(&mut self, path: &str) -> Result<Vec<u8>, AssetReadError> {
        self.read_bytes(path).map_err(|e| AssetReadError {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }
}

/// Full path of the package rootfile declared in `container.xml`
fn parse_container(xml: &str) -> Result<Option<String>, StructureError> {
    let malformed = |message: String| StructureError::MalformedXml {
        path: CONTAINER_PATH.to_string(),
        message,
    };

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut rootfiles: Vec<(String, Option<String>)> = Vec::new();
    loop {
        match reader.read_event().map_err(|e| malformed(e.to_string()))? {
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"rootfile" => {
                let full_path = attr(e, b"full-path").map_err(|e| malformed(e.to_string()))?;
                let media_type = attr(e, b"media-type").map_err(|e| malformed(e.to_string()))?;
                if let Some(full_path) = full_path.filter(|p| !p.is_empty()) {
                    rootfiles.push((full_path, media_type));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let preferred = rootfiles
        .iter()
        .position(|(_, media)| media.as_deref() == Some(PACKAGE_MEDIA_TYPE))
        .unwrap_or(0);
    Ok(rootfiles
        .into_iter()
        .nth(preferred)
        .map(|(path, _)| path.trim_start_matches('/').to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn build(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, body) in entries {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    #[test]
    fn test_parse_container_prefers_package_type() {
        let xml = r#"<container><rootfiles>
            <rootfile full-path="toc.ncx" media-type="application/x-dtbncx+xml"/>
            <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
        </rootfiles></container>"#;
        assert_eq!(parse_container(xml).unwrap().as_deref(), Some("OEBPS/content.opf"));
        assert_eq!(parse_container("<container/>").unwrap(), None);
    }

    #[test]
    fn test_package_path_falls_back_to_first_opf() {
        let data = build(&[("mimetype", "application/epub+zip"), ("book/pkg.opf", "<package/>")]);
        let mut archive = EpubArchive::from_bytes(data).unwrap();
        assert_eq!(archive.package_path().unwrap(), "book/pkg.opf");
    }

    #[test]
    fn test_missing_container_and_opf() {
        let data = build(&[("mimetype", "application/epub+zip")]);
        let mut archive = EpubArchive::from_bytes(data).unwrap();
        assert!(matches!(
            archive.package_path(),
            Err(StructureError::MissingEntry(_))
        ));
    }

    #[test]
    fn test_not_a_zip() {
        let result = EpubArchive::from_bytes(b"plain text".to_vec());
        assert!(matches!(result, Err(StructureError::InvalidArchive(_))));
    }

    #[test]
    fn test_declared_entry_size_is_not_trusted() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let stored = FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        zip.start_file("big.bin", stored).unwrap();
        zip.write_all(b"tiny").unwrap();
        let mut data = zip.finish().unwrap().into_inner();

        // Declare a 4 GiB uncompressed size in the central directory
        let central = data.windows(4).position(|w| w == b"PK\x01\x02").unwrap();
        data[central + 24..central + 28].copy_from_slice(&0xFFFF_FFF0u32.to_le_bytes());

        let mut archive = EpubArchive::from_bytes(data).unwrap();
        assert_eq!(archive.read_bytes("big.bin").unwrap(), b"tiny");
    }

    #[test]
    fn test_read_asset_missing() {
        let data = build(&[("a.txt", "x")]);
        let mut archive = EpubArchive::from_bytes(data).unwrap();
        assert_eq!(archive.read_asset("a.txt").unwrap(), b"x");
        let err = archive.read_asset("nope.png").unwrap_err();
        assert_eq!(err.path, "nope.png");
    }
}
