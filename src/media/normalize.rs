//! Pure image normalization for uploads
//!
//! Validates and re-encodes uploaded bytes into a canonical storage
//! format: PNG stays PNG (alpha preserved), JPEG and WEBP become RGB
//! JPEG, and anything wider/taller than [`MAX_EDGE`] is downscaled so
//! the longest side equals the threshold. No I/O, no hidden state; the
//! same input always yields the same output for a fixed encoder
//! version.

use crate::error::{AppError, AppResult};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;

/// Longest side of a stored image, in pixels
pub const MAX_EDGE: u32 = 1600;

/// Quality for re-encoded JPEGs
pub const JPEG_QUALITY: u8 = 85;

/// Accepted input formats, keyed by declared content type
///
/// GIF is deliberately absent: callers pass GIF bytes through to the
/// media store unmodified and it never reaches the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
    Webp,
}

impl SourceFormat {
    pub fn from_mime(mime: &str) -> Option<Self> {
        match mime {
            "image/jpeg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }
}

/// Canonical bytes ready for the media store
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub bytes: Vec<u8>,
    /// Storage extension including the dot: ".png" or ".jpg"
    pub extension: &'static str,
}

/// Read image dimensions from the header without decoding pixel data
///
/// Used to enforce the upload dimension limit before a full decode of
/// untrusted bytes.
pub fn probe_dimensions(data: &[u8]) -> AppResult<(u32, u32)> {
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| AppError::InvalidImage(format!("unreadable image header: {}", e)))?
        .into_dimensions()
        .map_err(|e| AppError::InvalidImage(format!("unreadable image header: {}", e)))
}

/// Normalize uploaded bytes into their canonical storage encoding
pub fn normalize(data: &[u8], format: SourceFormat) -> AppResult<NormalizedImage> {
    let decoded = image::load_from_memory(data)
        .map_err(|e| AppError::InvalidImage(format!("undecodable image: {}", e)))?;

    // Downscale only; images already under the threshold keep their
    // original resolution.
    let img = if decoded.width().max(decoded.height()) > MAX_EDGE {
        decoded.resize(MAX_EDGE, MAX_EDGE, FilterType::Lanczos3)
    } else {
        decoded
    };

    let mut buf = Vec::new();
    match format {
        SourceFormat::Png => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(|e| AppError::InvalidImage(format!("PNG encode failed: {}", e)))?;
            Ok(NormalizedImage {
                bytes: buf,
                extension: ".png",
            })
        }
        SourceFormat::Jpeg | SourceFormat::Webp => {
            let rgb = img.to_rgb8();
            let mut cursor = Cursor::new(&mut buf);
            let encoder = JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
            rgb.write_with_encoder(encoder)
                .map_err(|e| AppError::InvalidImage(format!("JPEG encode failed: {}", e)))?;
            Ok(NormalizedImage {
                bytes: buf,
                extension: ".jpg",
            })
        }
    }
}
