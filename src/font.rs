//! Font loading and text rasterization via `fontdue`.
//!
//! A [`FontResource`] is parsed once per run and then only read: it is
//! shared by reference with every worker and exposes no mutation. Each call
//! to [`TextRasterizer::rasterize`] lays the string out on a single line,
//! rasterizes every glyph at the requested size, and returns the coverage
//! cropped to the ink bounds.

use crate::watermark::{GlyphMask, TextRasterizer};
use fontdue::layout::{CoordinateSystem, Layout, LayoutSettings, TextStyle};
use fontdue::{Font, FontSettings};
use image::GrayImage;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Font tried when no `--font` is given.
pub const FALLBACK_FONT: &str = "fonts/NotoSansJP-Regular.ttf";

#[derive(Error, Debug)]
pub enum FontError {
    #[error("failed to read font {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse font {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("no usable font found (tried: {}); pass one with --font", format_tried(.0))]
    NotFound(Vec<PathBuf>),
}

fn format_tried(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A parsed TTF/OTF face (or one face of a TTC collection).
pub struct FontResource {
    font: Font,
    path: PathBuf,
    /// SHA-256 of the font file, part of the cache key.
    fingerprint: String,
}

impl FontResource {
    /// Parse `bytes` as a font; `collection_index` selects the face in a TTC.
    pub fn from_bytes(
        bytes: &[u8],
        collection_index: u32,
        path: impl Into<PathBuf>,
    ) -> Result<Self, FontError> {
        let path = path.into();
        let settings = FontSettings {
            collection_index,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(bytes, settings).map_err(|message| FontError::Parse {
            path: path.clone(),
            message: message.to_string(),
        })?;
        Ok(Self {
            font,
            path,
            fingerprint: format!("{:x}", Sha256::digest(bytes)),
        })
    }

    pub fn load(path: &Path, collection_index: u32) -> Result<Self, FontError> {
        let bytes = std::fs::read(path).map_err(|source| FontError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes, collection_index, path)
    }

    /// Load the first candidate that exists on disk.
    ///
    /// A candidate that exists but fails to parse is an error; later
    /// candidates are not tried.
    pub fn load_first(candidates: &[PathBuf], collection_index: u32) -> Result<Self, FontError> {
        match candidates.iter().find(|p| p.is_file()) {
            Some(path) => Self::load(path, collection_index),
            None => Err(FontError::NotFound(candidates.to_vec())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Candidate font paths in resolution order.
pub fn font_candidates(explicit: Option<&Path>) -> Vec<PathBuf> {
    explicit
        .map(Path::to_path_buf)
        .into_iter()
        .chain(std::iter::once(PathBuf::from(FALLBACK_FONT)))
        .collect()
}

impl TextRasterizer for FontResource {
    fn rasterize(&self, text: &str, px: u32) -> GlyphMask {
        let px = px.max(1) as f32;
        let mut layout: Layout = Layout::new(CoordinateSystem::PositiveYDown);
        layout.reset(&LayoutSettings::default());
        layout.append(&[&self.font], &TextStyle::new(text, px, 0));

        let glyphs: Vec<_> = layout
            .glyphs()
            .iter()
            .filter(|g| g.width > 0 && g.height > 0)
            .collect();
        if glyphs.is_empty() {
            return GlyphMask::blank(0, 0);
        }

        // Glyph boxes in layout space, snapped to whole pixels
        let left = glyphs.iter().map(|g| g.x.floor() as i64).min().unwrap_or(0);
        let top = glyphs.iter().map(|g| g.y.floor() as i64).min().unwrap_or(0);
        let right = glyphs
            .iter()
            .map(|g| g.x.floor() as i64 + g.width as i64)
            .max()
            .unwrap_or(0);
        let bottom = glyphs
            .iter()
            .map(|g| g.y.floor() as i64 + g.height as i64)
            .max()
            .unwrap_or(0);

        let mut canvas = GrayImage::new((right - left) as u32, (bottom - top) as u32);
        for glyph in glyphs {
            let (metrics, coverage) = self.font.rasterize_config(glyph.key);
            if metrics.width == 0 {
                continue;
            }
            let ox = glyph.x.floor() as i64 - left;
            let oy = glyph.y.floor() as i64 - top;
            for (i, &c) in coverage.iter().enumerate() {
                if c == 0 {
                    continue;
                }
                let x = ox + (i % metrics.width) as i64;
                let y = oy + (i / metrics.width) as i64;
                if x < 0 || y < 0 || x >= canvas.width() as i64 || y >= canvas.height() as i64 {
                    continue;
                }
                // Overlapping glyphs (kerning, combining marks) keep the stronger coverage
                let dst = canvas.get_pixel_mut(x as u32, y as u32);
                dst.0[0] = dst.0[0].max(c);
            }
        }

        GlyphMask::new(canvas).trimmed().0
    }
}
