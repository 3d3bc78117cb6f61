//! The watermark layout-and-rendering engine.
//!
//! Pure pixel work, no I/O. For one image the stages run strictly in order:
//!
//! ```text
//! image size ──► size::resolve_font_size ──► px
//! text, px  ──► TextRasterizer::rasterize ──► GlyphMask
//! GlyphMask ──► decoration::render ──► (shadow layer, text layer)
//! sizes     ──► layout::placements ──► Placements
//! all above ──► composite::composite ──► new RgbaImage
//! ```
//!
//! | Module | Role |
//! |--------|------|
//! | [`size`] | Font pixel size from a fixed value or a ratio of an image metric |
//! | [`layout`] | Anchors for bottom-right, center, tile and diagonal-tile modes |
//! | [`decoration`] | Pseudo-bold stroke and blurred drop shadow masks |
//! | [`composite`] | Straight-alpha "over" blending with clipping |
//! | [`glyph`] | [`GlyphMask`] and the [`TextRasterizer`] font seam |
//!
//! Everything here is a pure function of its inputs, so one [`Watermark`]
//! and one rasterizer can be shared by every worker in a batch.

pub mod composite;
pub mod decoration;
pub mod glyph;
pub mod layout;
pub mod size;

pub use composite::{Paint, composite};
pub use decoration::{Decoration, MaskLayer, Shadow};
pub use glyph::{GlyphMask, TextRasterizer};
pub use layout::{LayoutParams, Mode, Placement, Placements, placements};
pub use size::{Fit, SizingRule, resolve_font_size};

use image::{Rgba, RgbaImage};
use serde::Serialize;
use thiserror::Error;

/// A watermark setting outside its allowed range or vocabulary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid config: {0}")]
pub struct InvalidConfig(pub String);

/// Text fill color; the alpha channel comes from the watermark opacity.
const TEXT_RGB: [u8; 3] = [255, 255, 255];
const SHADOW_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Fully resolved watermark parameters, shared by every image in a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Watermark {
    pub text: String,
    pub sizing: SizingRule,
    pub mode: Mode,
    /// Bottom-right inset as a fraction of the image's longer edge.
    pub margin_ratio: f64,
    pub tile_step: (f64, f64),
    pub diag_step: f64,
    pub decoration: Decoration,
    /// Alpha of the text fill, 0–255.
    pub opacity: u8,
}

impl Watermark {
    /// A watermark with the stock settings for `text`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sizing: SizingRule::Ratio {
                ratio: 0.05,
                fit: Fit::Diag,
            },
            mode: Mode::BottomRight,
            margin_ratio: 0.02,
            tile_step: (1.0, 1.0),
            diag_step: 1.5,
            decoration: Decoration::default(),
            opacity: 128,
        }
    }

    /// Layout parameters for an image of the given size.
    pub fn layout_params(&self, width: u32, height: u32) -> LayoutParams {
        let long_edge = width.max(height) as f64;
        LayoutParams {
            mode: self.mode,
            margin: (long_edge * self.margin_ratio).max(0.0) as u32,
            tile_step: self.tile_step,
            diag_step: self.diag_step,
        }
    }
}

/// Watermark `image`, returning a new buffer.
///
/// Text that rasterizes to no ink at all (whitespace, glyphs missing from
/// the font) leaves the image unchanged.
pub fn apply(
    image: &RgbaImage,
    watermark: &Watermark,
    rasterizer: &(impl TextRasterizer + ?Sized),
) -> Result<RgbaImage, InvalidConfig> {
    let (w, h) = image.dimensions();
    let px = resolve_font_size(&watermark.sizing, w, h)?;
    let mask = rasterizer.rasterize(&watermark.text, px);
    if !mask.has_ink() {
        return Ok(image.clone());
    }
    let (shadow, text) = decoration::render(&mask, &watermark.decoration)?;
    let anchors = placements(
        &watermark.layout_params(w, h),
        (w, h),
        (mask.width(), mask.height()),
    )?;

    let [r, g, b] = TEXT_RGB;
    let text_paint = Paint {
        layer: &text,
        color: Rgba([r, g, b, watermark.opacity]),
    };
    let shadow_paint = watermark
        .decoration
        .shadow
        .is_visible()
        .then_some(Paint {
            layer: &shadow,
            color: SHADOW_COLOR,
        });

    Ok(composite(image, anchors, shadow_paint, text_paint))
}
