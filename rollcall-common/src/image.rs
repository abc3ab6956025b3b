//! Self-describing image references
//!
//! Photos travel as data URIs (`data:image/jpeg;base64,...`), both for the
//! captured classroom photo and for stored profile photos.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A validated base64 image data URI
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageData {
    mime_type: String,
    /// Base64 payload exactly as received
    encoded: String,
}

impl ImageData {
    /// Parse and validate a data URI.
    ///
    /// The MIME type must be `image/*` and the payload must decode to at
    /// least one byte.
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .trim()
            .strip_prefix("data:")
            .ok_or_else(|| Error::InvalidImage("expected a data: URI".to_string()))?;

        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::InvalidImage("data URI has no payload".to_string()))?;

        let params = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::InvalidImage("data URI must be base64 encoded".to_string()))?;
        // Parameters such as `name=a.png` are dropped
        let mime_type = params.split(';').next().unwrap_or_default().trim();

        if !mime_type.starts_with("image/") || mime_type.len() <= "image/".len() {
            return Err(Error::InvalidImage(format!(
                "unsupported MIME type '{}'",
                mime_type
            )));
        }

        let decoded = STANDARD
            .decode(payload)
            .map_err(|e| Error::InvalidImage(format!("bad base64 payload: {}", e)))?;
        if decoded.is_empty() {
            return Err(Error::InvalidImage("image payload is empty".to_string()));
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            encoded: payload.to_string(),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload without the `data:` header
    pub fn base64_payload(&self) -> &str {
        &self.encoded
    }

    /// Full data URI form
    pub fn to_data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.encoded)
    }
}

impl fmt::Debug for ImageData {
    // Payloads run to megabytes; keep logs readable
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageData")
            .field("mime_type", &self.mime_type)
            .field("encoded_len", &self.encoded.len())
            .finish()
    }
}

impl FromStr for ImageData {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ImageData {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ImageData> for String {
    fn from(value: ImageData) -> Self {
        value.to_data_uri()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // 1x1 transparent PNG
    const PIXEL: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

    #[test]
    fn test_parse_valid_png_uri() {
        let uri = format!("data:image/png;base64,{}", PIXEL);
        let image = ImageData::parse(&uri).unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.base64_payload(), PIXEL);
        assert_eq!(image.to_data_uri(), uri);
    }

    #[test]
    fn test_mime_parameters_are_dropped() {
        let uri = format!("data:image/png;name=a.png;base64,{}", PIXEL);
        let image = ImageData::parse(&uri).unwrap();
        assert_eq!(image.mime_type(), "image/png");
        assert_eq!(image.to_data_uri(), format!("data:image/png;base64,{}", PIXEL));

        let odd = format!("data:text/plain;name=image/png;base64,{}", PIXEL);
        assert!(matches!(ImageData::parse(&odd), Err(Error::InvalidImage(_))));
    }

    #[test]
    fn test_rejects_non_image_mime() {
        let uri = format!("data:text/plain;base64,{}", PIXEL);
        assert!(matches!(ImageData::parse(&uri), Err(Error::InvalidImage(_))));
    }

    #[test]
    fn test_rejects_url_and_missing_payload() {
        assert!(ImageData::parse("https://example.com/a.png").is_err());
        assert!(ImageData::parse("data:image/png;base64").is_err());
        assert!(ImageData::parse("data:image/png;base64,").is_err());
        assert!(ImageData::parse("data:image/png,rawbytes").is_err());
    }

    #[test]
    fn test_rejects_bad_base64() {
        assert!(ImageData::parse("data:image/jpeg;base64,***").is_err());
    }

    #[test]
    fn test_debug_does_not_dump_payload() {
        let image = ImageData::parse(&format!("data:image/png;base64,{}", PIXEL)).unwrap();
        let rendered = format!("{:?}", image);
        assert!(!rendered.contains(PIXEL));
        assert!(rendered.contains("image/png"));
    }
}
