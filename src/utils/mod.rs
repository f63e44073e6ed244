//! Utility modules shared by the client and the MCP layer.
//!
//! - [`HttpClient`]: a shared `reqwest` client with sensible timeouts
//! - [`encode_image`]: base64 image payloads with media-type detection

mod http;
mod image;

pub use http::HttpClient;
pub use image::{encode_image, sniff_mime_type, EncodedImage, FALLBACK_MIME_TYPE};
