//! Image encoding: raw file bytes → base64 `data:` URL.
//!
//! Rendering services accept images as base64 data-URIs embedded in the
//! request body. Before encoding we sniff the real format from the magic
//! bytes and read the image header, so a renamed text file or a truncated
//! upload is refused here rather than by the remote service.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use tracing::debug;

/// The result of decoding one image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    /// MIME type of the sniffed format.
    pub mime_type: String,
    pub width: u32,
    pub height: u32,
    /// `data:<mime>;base64,<payload>`
    pub data_url: String,
}

/// Sniff, header-decode and base64-encode `bytes`.
///
/// Returns a human-readable reason on failure.
pub fn encode_image(bytes: &[u8]) -> Result<EncodedImage, String> {
    if bytes.is_empty() {
        return Err("file is empty".to_string());
    }

    let format =
        image::guess_format(bytes).map_err(|_| "unrecognised image data".to_string())?;
    let mime_type = mime_for_format(format)
        .ok_or_else(|| format!("unsupported image format {format:?}"))?
        .to_string();

    let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
        .into_dimensions()
        .map_err(|e| format!("cannot read {format:?} image: {e}"))?;

    let data_url = to_data_url(&mime_type, bytes);
    debug!(
        "Encoded {}x{} {} → {} bytes data URL",
        width,
        height,
        mime_type,
        data_url.len()
    );

    Ok(EncodedImage {
        mime_type,
        width,
        height,
        data_url,
    })
}

/// Wrap `bytes` in a base64 `data:` URL.
pub fn to_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// MIME type for a sniffed image format.
pub fn mime_for_format(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Png => Some("image/png"),
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Bmp => Some("image/bmp"),
        ImageFormat::Tiff => Some("image/tiff"),
        _ => None,
    }
}

/// MIME type implied by a filename extension, like a browser's `File.type`.
///
/// Unknown extensions map to `application/octet-stream`.
pub fn mime_from_extension(name: &str) -> &'static str {
    let ext = name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}
