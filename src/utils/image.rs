//! Image payload encoding for MCP image content blocks.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// A base64-encoded image with its media type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: String,
}

/// Media type used when neither the header nor the bytes identify the image
pub const FALLBACK_MIME_TYPE: &str = "image/png";

/// Base64-encode raw image bytes.
///
/// The media type comes from the magic bytes when recognizable, otherwise
/// from an `image/*` content-type header, otherwise [`FALLBACK_MIME_TYPE`].
pub fn encode_image(bytes: &[u8], content_type: Option<&str>) -> EncodedImage {
    let mime_type = sniff_mime_type(bytes)
        .map(str::to_string)
        .or_else(|| {
            content_type
                .and_then(|ct| ct.split(';').next())
                .map(|ct| ct.trim().to_ascii_lowercase())
                .filter(|ct| ct.starts_with("image/"))
        })
        .unwrap_or_else(|| FALLBACK_MIME_TYPE.to_string());

    EncodedImage {
        data: STANDARD.encode(bytes),
        mime_type,
    }
}

/// Detect common image formats from their signatures
pub fn sniff_mime_type(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}
