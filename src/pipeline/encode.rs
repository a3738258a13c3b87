//! Image encoding: page image file → base64 payload for the request body.
//!
//! The stored PNG bytes are sent as-is; no decode/re-encode round trip, so
//! the model sees exactly the pixels the render stage wrote.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A page image ready to embed in a completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub source: PathBuf,
    pub mime_type: &'static str,
    /// Base64 (standard alphabet, padded) of the file bytes.
    pub data: String,
    /// Size of the raw file in bytes.
    pub raw_len: usize,
}

impl EncodedImage {
    /// `data:` URI form, as accepted by OpenAI-style `image_url` parts.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// MIME type for a page image, from its extension. Unknown extensions are
/// treated as PNG, the format the render stage writes.
pub fn mime_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/png",
    }
}

/// Base64-encode raw image bytes.
pub fn encode_bytes(source: &Path, bytes: &[u8]) -> EncodedImage {
    let data = STANDARD.encode(bytes);
    debug!(
        "Encoded {} → {} bytes base64",
        source.display(),
        data.len()
    );
    EncodedImage {
        source: source.to_path_buf(),
        mime_type: mime_type_for(source),
        data,
        raw_len: bytes.len(),
    }
}

/// Read an image file and base64-encode it.
pub async fn encode_image_file(path: &Path) -> std::io::Result<EncodedImage> {
    let bytes = tokio::fs::read(path).await?;
    Ok(encode_bytes(path, &bytes))
}
