//! Clipboard image encoding and decoding
//!
//! Images are never stored in native bitmap form. Captured RGBA bitmaps are
//! re-encoded to PNG so the payload is storage-stable, and decoded back to
//! RGBA when an entry is written to the clipboard again.

use anyhow::{Context, Result};
use std::borrow::Cow;
use std::io::Cursor;
use tracing::{debug, warn};

/// PNG file signature
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Encode clipboard RGBA image data to PNG bytes
pub fn encode_image_to_png_bytes(image: &arboard::ImageData) -> Result<Vec<u8>> {
    let rgba_image = image::RgbaImage::from_raw(
        image.width as u32,
        image.height as u32,
        image.bytes.to_vec(),
    )
    .context("Failed to create RGBA image from clipboard data")?;

    let mut png_data = Vec::new();
    let mut cursor = Cursor::new(&mut png_data);
    rgba_image
        .write_to(&mut cursor, image::ImageFormat::Png)
        .context("Failed to encode image as PNG")?;

    debug!(
        width = image.width,
        height = image.height,
        png_len = png_data.len(),
        "Encoded clipboard image as PNG"
    );
    Ok(png_data)
}

/// Decode PNG bytes to clipboard RGBA image data
pub fn decode_png_to_image_data(png_bytes: &[u8]) -> Option<arboard::ImageData<'static>> {
    let img = match image::load_from_memory_with_format(png_bytes, image::ImageFormat::Png) {
        Ok(img) => img,
        Err(e) => {
            warn!(error = %e, len = png_bytes.len(), "Failed to decode PNG payload");
            return None;
        }
    };
    let rgba = img.to_rgba8();

    Some(arboard::ImageData {
        width: rgba.width() as usize,
        height: rgba.height() as usize,
        bytes: Cow::Owned(rgba.into_raw()),
    })
}

/// Check the PNG signature without decoding
pub fn is_png(bytes: &[u8]) -> bool {
    bytes.starts_with(&PNG_SIGNATURE)
}

/// Extract dimensions from the PNG header without a full decode
pub fn get_png_dimensions(png_bytes: &[u8]) -> Option<(u32, u32)> {
    let cursor = Cursor::new(png_bytes);
    let reader = image::ImageReader::with_format(cursor, image::ImageFormat::Png);
    reader.into_dimensions().ok()
}

/// Compute a simple hash of image data for change detection
pub fn compute_image_hash(image: &arboard::ImageData) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    image.width.hash(&mut hasher);
    image.height.hash(&mut hasher);

    // Hash first 1KB of pixels for quick comparison
    let sample_size = 1024.min(image.bytes.len());
    image.bytes[..sample_size].hash(&mut hasher);

    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image(width: usize, height: usize) -> arboard::ImageData<'static> {
        let mut bytes = Vec::with_capacity(width * height * 4);
        for i in 0..width * height {
            bytes.extend_from_slice(&[(i % 256) as u8, 0, 255 - (i % 256) as u8, 255]);
        }
        arboard::ImageData {
            width,
            height,
            bytes: bytes.into(),
        }
    }

    #[test]
    fn test_png_roundtrip_preserves_pixels() {
        let original = sample_image(2, 2);

        let png = encode_image_to_png_bytes(&original).expect("Should encode as PNG");
        assert!(is_png(&png), "Encoded bytes should carry the PNG signature");

        let decoded = decode_png_to_image_data(&png).expect("Should decode");
        assert_eq!(original.width, decoded.width);
        assert_eq!(original.height, decoded.height);
        assert_eq!(original.bytes.as_ref(), decoded.bytes.as_ref());
    }

    #[test]
    fn test_png_dimensions_from_header() {
        let png = encode_image_to_png_bytes(&sample_image(100, 50)).expect("Should encode");
        assert_eq!(get_png_dimensions(&png), Some((100, 50)));
    }

    #[test]
    fn test_mismatched_byte_count_fails_to_encode() {
        let broken = arboard::ImageData {
            width: 10,
            height: 10,
            bytes: vec![0u8; 12].into(),
        };
        assert!(encode_image_to_png_bytes(&broken).is_err());
    }

    #[test]
    fn test_garbage_does_not_decode() {
        assert!(decode_png_to_image_data(b"not a png").is_none());
        assert!(!is_png(b"not a png"));
    }

    #[test]
    fn test_image_hash_deterministic() {
        let image = sample_image(100, 100);
        assert_eq!(compute_image_hash(&image), compute_image_hash(&image));
    }
}
