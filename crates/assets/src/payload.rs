use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::AssetError;

/// Decoded size cap for banner/avatar uploads.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
/// Decoded size cap for QR logo overlays.
pub const MAX_LOGO_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Banner,
    Avatar,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Banner => "banner",
            ImageKind::Avatar => "avatar",
        }
    }
}

/// A decoded image payload with its sniffed file extension.
#[derive(Debug, Clone)]
pub struct ImagePayload {
    pub data: Vec<u8>,
    pub extension: &'static str,
}

impl ImagePayload {
    /// Decodes a base64 payload, optionally wrapped in a
    /// `data:image/...;base64,` header. The mime declared in the header is
    /// ignored; the real format is sniffed from the decoded bytes. The size
    /// cap is enforced before any sniffing or persistence.
    pub fn decode(raw: &str, limit: usize) -> Result<Self, AssetError> {
        let content = strip_data_url_header(raw);
        let data = base64::engine::general_purpose::STANDARD
            .decode(content.trim())
            .map_err(|e| AssetError::InvalidPayload(format!("base64 decode failed: {}", e)))?;

        if data.len() > limit {
            return Err(AssetError::TooLarge { limit });
        }

        let extension = sniff_extension(&data)?;
        Ok(Self { data, extension })
    }
}

fn strip_data_url_header(raw: &str) -> &str {
    if !raw.starts_with("data:") {
        return raw;
    }
    match raw.split_once(";base64,") {
        Some((_, content)) => content,
        None => raw,
    }
}

fn sniff_extension(data: &[u8]) -> Result<&'static str, AssetError> {
    match image::guess_format(data) {
        Ok(image::ImageFormat::Png) => Ok("png"),
        Ok(image::ImageFormat::Jpeg) => Ok("jpg"),
        Ok(image::ImageFormat::WebP) => Ok("webp"),
        Ok(other) => Err(AssetError::UnsupportedMedia(format!("{:?}", other))),
        Err(_) => Err(AssetError::UnsupportedMedia("unrecognized image bytes".to_string())),
    }
}
