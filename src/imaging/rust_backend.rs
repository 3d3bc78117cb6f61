//! Pure Rust image I/O backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, BMP) | `image::ImageReader` + `DynamicImage::from_decoder` |
//! | Orientation | `ImageDecoder::orientation` + `DynamicImage::apply_orientation` |
//! | Encode JPEG | `image::codecs::jpeg::JpegEncoder` at quality 95, alpha dropped |
//! | Encode BMP | `DynamicImage::save_with_format`, alpha dropped |
//! | Encode PNG, TIFF, WebP | `DynamicImage::save_with_format`, alpha kept |

use super::backend::{BackendError, ImageBackend};
use image::{DynamicImage, ImageDecoder, ImageFormat, ImageReader, RgbaImage};
use std::path::Path;
use std::sync::LazyLock;

/// JPEG quality for watermarked copies.
pub const JPEG_QUALITY: u8 = 95;

/// Extensions we can both decode and re-encode.
const PHOTO_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("png", ImageFormat::Png),
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("webp", ImageFormat::WebP),
    ("bmp", ImageFormat::Bmp),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    PHOTO_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled() && fmt.writing_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// Returns the image file extensions (lowercase) that can be watermarked.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

fn format_for(path: &Path) -> Option<ImageFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    PHOTO_CANDIDATES
        .iter()
        .find(|(candidate, _)| *candidate == ext)
        .map(|(_, fmt)| *fmt)
}

/// Pure Rust backend using the `image` crate.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_error(path: &Path, e: impl std::fmt::Display) -> BackendError {
    BackendError::Decode {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

fn encode_error(path: &Path, e: impl std::fmt::Display) -> BackendError {
    BackendError::Encode {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Encode and save as JPEG without alpha.
fn save_jpeg(img: &DynamicImage, path: &Path) -> Result<(), BackendError> {
    let file = std::fs::File::create(path)?;
    let writer = std::io::BufWriter::new(file);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(writer, JPEG_QUALITY);
    DynamicImage::ImageRgb8(img.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| encode_error(path, e))
}

impl ImageBackend for RustBackend {
    fn load(&self, path: &Path) -> Result<RgbaImage, BackendError> {
        let mut decoder = ImageReader::open(path)?
            .with_guessed_format()?
            .into_decoder()
            .map_err(|e| decode_error(path, e))?;
        let orientation = decoder.orientation().map_err(|e| decode_error(path, e))?;
        let mut img = DynamicImage::from_decoder(decoder).map_err(|e| decode_error(path, e))?;
        img.apply_orientation(orientation);
        Ok(img.to_rgba8())
    }

    fn save(&self, image: &RgbaImage, path: &Path) -> Result<(), BackendError> {
        let format = format_for(path).ok_or_else(|| {
            BackendError::UnsupportedFormat(
                path.extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_default(),
            )
        })?;
        let img = DynamicImage::ImageRgba8(image.clone());

        match format {
            ImageFormat::Jpeg => save_jpeg(&img, path),
            ImageFormat::Bmp => DynamicImage::ImageRgb8(img.to_rgb8())
                .save_with_format(path, format)
                .map_err(|e| encode_error(path, e)),
            _ => img
                .save_with_format(path, format)
                .map_err(|e| encode_error(path, e)),
        }
    }
}
