//! Stroke and drop-shadow layers derived from a glyph mask.
//!
//! Both layers are plain alpha masks with an offset relative to the
//! placement anchor; color is applied by the compositor.
//!
//! - **Text layer**: the glyph mask, or its disc dilation by `stroke_width`
//!   pixels (pseudo-bold). Dilation grows the mask on every side, so the
//!   layer's offset is `-stroke_width` on both axes.
//! - **Shadow layer**: the *undilated* mask with alpha scaled by
//!   `alpha / 255`, then Gaussian-blurred when `blur > 0`. Blurring spreads
//!   coverage outwards, so the mask is padded by `3 × blur` first and the
//!   offset compensates for the padding.

use super::InvalidConfig;
use super::glyph::GlyphMask;
use image::{GrayImage, Luma};
use serde::Serialize;

/// Padding per unit of blur radius; a Gaussian is effectively zero beyond 3σ.
const BLUR_PAD_FACTOR: u32 = 3;

/// Largest accepted stroke radius, in pixels.
pub const MAX_STROKE_WIDTH: u32 = 100;

/// Largest accepted shadow blur radius, in pixels.
pub const MAX_SHADOW_BLUR: u32 = 100;

/// Drop-shadow parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shadow {
    /// Translation from the text anchor, in pixels.
    pub offset: (i32, i32),
    /// Opacity multiplier, 0–255.
    pub alpha: u8,
    /// Gaussian blur radius in pixels; 0 disables blurring.
    pub blur: u32,
}

impl Shadow {
    /// Whether the shadow contributes anything at all.
    ///
    /// A fully transparent shadow, or one sitting exactly under the text,
    /// is not drawn.
    pub fn is_visible(&self) -> bool {
        self.alpha > 0 && self.offset != (0, 0)
    }
}

impl Default for Shadow {
    fn default() -> Self {
        Self {
            offset: (2, 2),
            alpha: 180,
            blur: 0,
        }
    }
}

/// Decoration applied around the raw glyph mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Decoration {
    /// Dilation radius for the pseudo-bold stroke; 0 leaves the glyphs as-is.
    pub stroke_width: u32,
    pub shadow: Shadow,
}

impl Decoration {
    /// Check the radii against [`MAX_STROKE_WIDTH`] and [`MAX_SHADOW_BLUR`].
    pub fn validate(&self) -> Result<(), InvalidConfig> {
        if self.stroke_width > MAX_STROKE_WIDTH {
            return Err(InvalidConfig(format!(
                "stroke width must be 0-{MAX_STROKE_WIDTH} (got {})",
                self.stroke_width
            )));
        }
        if self.shadow.blur > MAX_SHADOW_BLUR {
            return Err(InvalidConfig(format!(
                "shadow blur must be 0-{MAX_SHADOW_BLUR} (got {})",
                self.shadow.blur
            )));
        }
        Ok(())
    }
}

/// An alpha mask positioned relative to a placement anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskLayer {
    pub alpha: GrayImage,
    /// Top-left of the mask relative to the anchor.
    pub offset: (i64, i64),
}

impl MaskLayer {
    pub fn width(&self) -> u32 {
        self.alpha.width()
    }

    pub fn height(&self) -> u32 {
        self.alpha.height()
    }
}

/// Derive the `(shadow, text)` layers for a glyph mask.
///
/// Radii above the accepted maximum are rejected before any buffer is
/// allocated.
pub fn render(
    mask: &GlyphMask,
    decoration: &Decoration,
) -> Result<(MaskLayer, MaskLayer), InvalidConfig> {
    decoration.validate()?;

    let text = if decoration.stroke_width == 0 {
        MaskLayer {
            alpha: mask.alpha().clone(),
            offset: (0, 0),
        }
    } else {
        let r = decoration.stroke_width;
        MaskLayer {
            alpha: dilate(mask.alpha(), r)?,
            offset: (-i64::from(r), -i64::from(r)),
        }
    };

    Ok((render_shadow(mask, &decoration.shadow)?, text))
}

fn render_shadow(mask: &GlyphMask, shadow: &Shadow) -> Result<MaskLayer, InvalidConfig> {
    let scaled = scale_alpha(mask.alpha(), shadow.alpha);
    let (dx, dy) = (i64::from(shadow.offset.0), i64::from(shadow.offset.1));

    if shadow.blur == 0 {
        return Ok(MaskLayer {
            alpha: scaled,
            offset: (dx, dy),
        });
    }

    let pad = shadow
        .blur
        .checked_mul(BLUR_PAD_FACTOR)
        .ok_or_else(|| InvalidConfig(format!("shadow blur {} is too large", shadow.blur)))?;
    let mut padded = grown_canvas(&scaled, pad)?;
    image::imageops::replace(&mut padded, &scaled, i64::from(pad), i64::from(pad));
    let blurred = image::imageops::blur(&padded, shadow.blur as f32);

    Ok(MaskLayer {
        alpha: blurred,
        offset: (dx - i64::from(pad), dy - i64::from(pad)),
    })
}

/// A blank canvas `by` pixels larger than `alpha` on every side.
fn grown_canvas(alpha: &GrayImage, by: u32) -> Result<GrayImage, InvalidConfig> {
    let grow = |extent: u32| by.checked_mul(2).and_then(|b| extent.checked_add(b));
    match (grow(alpha.width()), grow(alpha.height())) {
        (Some(w), Some(h)) => Ok(GrayImage::new(w, h)),
        _ => Err(InvalidConfig(format!(
            "a {by}px border does not fit around a {}x{} mask",
            alpha.width(),
            alpha.height()
        ))),
    }
}

/// Multiply every alpha value by `factor / 255`, rounding to nearest.
fn scale_alpha(alpha: &GrayImage, factor: u8) -> GrayImage {
    let factor = u32::from(factor);
    let mut out = alpha.clone();
    for Luma([a]) in out.pixels_mut() {
        *a = ((u32::from(*a) * factor + 127) / 255) as u8;
    }
    out
}

/// Grey-scale dilation with a disc of the given radius.
///
/// The output is `2 × radius` larger on each axis; input pixel `(x, y)`
/// maps to output `(x + radius, y + radius)`.
fn dilate(alpha: &GrayImage, radius: u32) -> Result<GrayImage, InvalidConfig> {
    let mut out = grown_canvas(alpha, radius)?;
    let r = i64::from(radius);
    let disc: Vec<(i64, i64)> = (-r..=r)
        .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
        .filter(|(dx, dy)| dx * dx + dy * dy <= r * r)
        .collect();

    for (x, y, Luma([a])) in alpha.enumerate_pixels() {
        if *a == 0 {
            continue;
        }
        let (cx, cy) = (i64::from(x) + r, i64::from(y) + r);
        for (dx, dy) in &disc {
            let px = out.get_pixel_mut((cx + dx) as u32, (cy + dy) as u32);
            if px.0[0] < *a {
                px.0[0] = *a;
            }
        }
    }
    Ok(out)
}
