//! Binary assets (images and other non-document manifest items)

use serde::{Deserialize, Serialize};

/// A single asset carried alongside the chapters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Asset {
    /// Path inside the source (archive entry or file relative to the input)
    pub source_path: String,

    /// Output-relative path, e.g. `images/cover.jpg`
    pub output_path: String,

    /// MIME type (e.g., "image/png")
    pub media_type: String,

    /// Raw bytes
    #[serde(with = "base64_serde")]
    pub data: Vec<u8>,

    /// Whether this asset is the book's cover image
    pub is_cover: bool,
}

impl Asset {
    /// Create a new asset
    pub fn new(
        source_path: impl Into<String>,
        output_path: impl Into<String>,
        media_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            output_path: output_path.into(),
            media_type: media_type.into(),
            data,
            is_cover: false,
        }
    }

    /// Mark this asset as the cover
    pub fn as_cover(mut self) -> Self {
        self.is_cover = true;
        self
    }

    /// File name component of the output path
    pub fn file_name(&self) -> &str {
        self.output_path
            .rsplit('/')
            .next()
            .unwrap_or(&self.output_path)
    }
}

/// Base64 serialization for binary data
mod base64_serde {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
