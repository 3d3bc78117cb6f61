//! Shared test utilities for the wmark test suite.
//!
//! Provides a deterministic stand-in rasterizer (so engine tests need no
//! font files) and helpers that write real image files into a temp
//! directory for batch-level tests.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = photo_dir(&[("a.png", 40, 30), ("b.jpg", 64, 48)]);
//! write_corrupt(tmp.path(), "broken.jpg");
//!
//! let mask = BlockRasterizer.rasterize("ab", 10);
//! assert_eq!((mask.width(), mask.height()), (20, 10));
//! ```

use image::{GrayImage, Luma, Rgba, RgbaImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::watermark::{GlyphMask, TextRasterizer};

// =========================================================================
// Rasterizer stand-in
// =========================================================================

/// Renders every character as a fully opaque `px`×`px` square.
///
/// `"ab"` at 10 px is a solid 20×10 mask; the empty string is a 0×0 mask.
pub struct BlockRasterizer;

impl TextRasterizer for BlockRasterizer {
    fn rasterize(&self, text: &str, px: u32) -> GlyphMask {
        let chars = text.chars().count() as u32;
        if chars == 0 || px == 0 {
            return GlyphMask::blank(0, 0);
        }
        GlyphMask::new(GrayImage::from_pixel(chars * px, px, Luma([255])))
    }
}

/// The DejaVu Sans Mono face kept in `fixtures/fonts/`.
pub fn fixture_font_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/fonts/DejaVuSansMono.ttf")
}

// =========================================================================
// Image fixtures
// =========================================================================

/// A mid-grey opaque test photo with a little structure in it.
pub fn test_photo(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([
            (80 + x % 40) as u8,
            (80 + y % 40) as u8,
            100,
            255,
        ])
    })
}

/// Encode a test photo to `dir/name`, format chosen by extension.
pub fn write_photo(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    let photo = image::DynamicImage::ImageRgba8(test_photo(width, height));
    let is_jpeg = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("jpg" | "jpeg" | "JPG" | "JPEG")
    );
    if is_jpeg {
        photo.to_rgb8().save(&path).unwrap();
    } else {
        photo.save(&path).unwrap();
    }
    path
}

/// A minimal big-endian EXIF APP1 segment holding only an Orientation tag.
fn exif_orientation_segment(orientation: u16) -> Vec<u8> {
    let mut tiff = b"MM\x00\x2A\x00\x00\x00\x08".to_vec();
    tiff.extend_from_slice(&1u16.to_be_bytes()); // entries in IFD0
    tiff.extend_from_slice(&0x0112u16.to_be_bytes()); // Orientation
    tiff.extend_from_slice(&3u16.to_be_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_be_bytes());
    tiff.extend_from_slice(&orientation.to_be_bytes());
    tiff.extend_from_slice(&[0, 0]);
    tiff.extend_from_slice(&0u32.to_be_bytes()); // no next IFD

    let length = (2 + 6 + tiff.len()) as u16;
    let mut segment = vec![0xFF, 0xE1];
    segment.extend_from_slice(&length.to_be_bytes());
    segment.extend_from_slice(b"Exif\0\0");
    segment.extend_from_slice(&tiff);
    segment
}

/// Encode `photo` as a JPEG tagged with EXIF `orientation` (1-8).
pub fn write_oriented_jpeg(dir: &Path, name: &str, photo: &RgbaImage, orientation: u16) -> PathBuf {
    let mut jpeg = Vec::new();
    image::DynamicImage::ImageRgba8(photo.clone())
        .to_rgb8()
        .write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
        .unwrap();

    // APP1 goes straight after the SOI marker
    let mut bytes = jpeg[..2].to_vec();
    bytes.extend(exif_orientation_segment(orientation));
    bytes.extend_from_slice(&jpeg[2..]);

    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Write bytes that carry an image extension but cannot be decoded.
pub fn write_corrupt(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, b"this is not an image").unwrap();
    path
}

/// A temp directory holding one test photo per `(name, width, height)`.
pub fn photo_dir(photos: &[(&str, u32, u32)]) -> TempDir {
    let tmp = TempDir::new().unwrap();
    for (name, w, h) in photos {
        write_photo(tmp.path(), name, *w, *h);
    }
    tmp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_rasterizer_is_one_square_per_char() {
        let mask = BlockRasterizer.rasterize("ab", 10);
        assert_eq!((mask.width(), mask.height()), (20, 10));
        assert!(mask.alpha().pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn block_rasterizer_empty_text() {
        assert!(BlockRasterizer.rasterize("", 10).is_empty());
    }

    #[test]
    fn oriented_jpeg_keeps_stored_dimensions() {
        let tmp = TempDir::new().unwrap();
        let path = write_oriented_jpeg(tmp.path(), "r.jpg", &test_photo(24, 12), 6);
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], &[0xFF, 0xD8, 0xFF, 0xE1]);
        assert_eq!(&bytes[6..12], b"Exif\0\0");
        // The header reports the stored size; rotation is up to the loader
        assert_eq!(image::image_dimensions(&path).unwrap(), (24, 12));
    }

    #[test]
    fn photo_dir_writes_decodable_files() {
        let tmp = photo_dir(&[("a.png", 12, 8), ("b.jpg", 16, 16)]);
        assert_eq!(
            image::image_dimensions(tmp.path().join("a.png")).unwrap(),
            (12, 8)
        );
        assert_eq!(
            image::image_dimensions(tmp.path().join("b.jpg")).unwrap(),
            (16, 16)
        );
    }
}
