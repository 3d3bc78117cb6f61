//! Rasterized text masks and the seam to the font collaborator.
//!
//! The engine never talks to a font library directly. It asks a
//! [`TextRasterizer`] for a [`GlyphMask`] at a given pixel size and works
//! purely on alpha values from there. The production implementation is
//! [`FontResource`](crate::font::FontResource); tests use a block-glyph
//! rasterizer that needs no font file.

use image::{GrayImage, Luma};

/// Alpha coverage of one rendered text run, tightly cropped to its ink.
///
/// The mask's dimensions are the text bounding box used by the layout
/// engine. A zero-sized mask is valid and composites as nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphMask {
    alpha: GrayImage,
}

impl GlyphMask {
    pub fn new(alpha: GrayImage) -> Self {
        Self { alpha }
    }

    /// An all-transparent mask of the given size.
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(GrayImage::new(width, height))
    }

    pub fn width(&self) -> u32 {
        self.alpha.width()
    }

    pub fn height(&self) -> u32 {
        self.alpha.height()
    }

    pub fn alpha(&self) -> &GrayImage {
        &self.alpha
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Whether any pixel has non-zero coverage.
    pub fn has_ink(&self) -> bool {
        self.alpha.pixels().any(|Luma([a])| *a > 0)
    }

    /// Crop to the smallest rectangle containing any non-zero coverage.
    ///
    /// Returns the cropped mask and the `(x, y)` of its top-left corner in
    /// the original mask. Fully transparent input crops to an empty mask.
    pub fn trimmed(&self) -> (GlyphMask, (u32, u32)) {
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0;
        let mut max_y = 0;
        for (x, y, Luma([a])) in self.alpha.enumerate_pixels() {
            if *a > 0 {
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
        if min_x == u32::MAX {
            return (GlyphMask::blank(0, 0), (0, 0));
        }
        let w = max_x - min_x + 1;
        let h = max_y - min_y + 1;
        let cropped = image::imageops::crop_imm(&self.alpha, min_x, min_y, w, h).to_image();
        (GlyphMask::new(cropped), (min_x, min_y))
    }
}

/// Anything that can turn a string into an alpha mask at a pixel size.
///
/// Must be `Sync`: one rasterizer is shared by every worker in a batch.
pub trait TextRasterizer: Sync {
    fn rasterize(&self, text: &str, px: u32) -> GlyphMask;
}
