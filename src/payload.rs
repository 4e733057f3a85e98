//! Image payloads: the one picture sent with every analysis.
//!
//! A payload is raw encoded bytes plus the declared media type. Bytes are
//! forwarded as-is; the media type is sniffed from content, never trusted
//! from a file extension.

use std::io::Cursor;
use std::path::Path;

use base64::{Engine, engine::general_purpose::STANDARD};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, RgbaImage};
use tracing::debug;

pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";

#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("failed to read image {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("not a recognized image format")]
    NotAnImage,

    #[error("failed to encode JPEG: {0}")]
    Encode(String),
}

/// An encoded image with its declared media type.
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `image/png`.
    pub media_type: String,
    /// Display name of the source (file name or `camera_capture.jpg`).
    pub name: String,
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("name", &self.name)
            .field("media_type", &self.media_type)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl ImagePayload {
    /// Wrap encoded bytes, sniffing the media type from their content.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::NotAnImage`] when the bytes are neither in a
    /// format the `image` crate recognizes nor a HEIF container.
    pub fn from_bytes(bytes: Vec<u8>, name: impl Into<String>) -> Result<Self, ImageError> {
        let media_type = match image::guess_format(&bytes) {
            Ok(format) => format.to_mime_type().to_string(),
            Err(_) => heif_media_type(&bytes).ok_or(ImageError::NotAnImage)?.to_string(),
        };
        if !media_type.starts_with("image/") {
            return Err(ImageError::NotAnImage);
        }
        Ok(Self { bytes, media_type, name: name.into() })
    }

    /// Load an image file chosen by the user.
    ///
    /// # Errors
    ///
    /// Returns [`ImageError::Read`] on I/O failure and
    /// [`ImageError::NotAnImage`] for non-image content.
    pub fn from_path(path: &Path) -> Result<Self, ImageError> {
        let bytes = std::fs::read(path)
            .map_err(|source| ImageError::Read { path: path.display().to_string(), source })?;
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        let payload = Self::from_bytes(bytes, name)?;
        debug!(name = %payload.name, media_type = %payload.media_type, bytes = payload.bytes.len(), "image loaded");
        Ok(payload)
    }

    /// Base64 (standard alphabet, padded) encoding of the bytes.
    #[must_use]
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:` URI form, as accepted by OpenAI-compatible image parts.
    #[must_use]
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.to_base64())
    }
}

/// Media type of an ISO-BMFF image container, read from its `ftyp` box.
///
/// The major brand wins; compatible brands are consulted when it is generic.
fn heif_media_type(bytes: &[u8]) -> Option<&'static str> {
    let header = bytes.get(..12)?;
    if &header[4..8] != b"ftyp" {
        return None;
    }
    let declared = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    let end = declared.clamp(12, bytes.len());
    let compatible = bytes.get(16..end).unwrap_or_default().chunks_exact(4);
    std::iter::once(&header[8..12]).chain(compatible).find_map(heif_brand)
}

fn heif_brand(brand: &[u8]) -> Option<&'static str> {
    match brand {
        b"heic" | b"heix" | b"heim" | b"heis" | b"hevc" | b"hevx" => Some("image/heic"),
        b"mif1" | b"msf1" | b"heif" => Some("image/heif"),
        b"avif" | b"avis" => Some("image/avif"),
        _ => None,
    }
}

/// Encode an RGBA frame as JPEG at the given quality (1-100).
///
/// Alpha is dropped; JPEG has no transparency.
///
/// # Errors
///
/// Returns [`ImageError::Encode`] if the encoder rejects the frame.
pub fn encode_jpeg(frame: &RgbaImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let rgb = DynamicImage::ImageRgba8(frame.clone()).to_rgb8();
    let mut buffer = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(&rgb)
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
#[path = "payload_test.rs"]
mod tests;
