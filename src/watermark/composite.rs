//! Alpha compositing of decoration layers onto a photo.
//!
//! Straight (non-premultiplied) "over" blending:
//!
//! ```text
//! a     = mask × paint.alpha / 255
//! out_c = src_c · a + dst_c · (1 − a)
//! out_a = a + dst_a · (1 − a)
//! ```
//!
//! computed in integer arithmetic with round-to-nearest so identical inputs
//! always produce identical bytes.

use super::decoration::MaskLayer;
use super::layout::Placement;
use image::{Rgba, RgbaImage};

/// A mask layer together with the color it is painted in.
#[derive(Debug, Clone, Copy)]
pub struct Paint<'a> {
    pub layer: &'a MaskLayer,
    /// Fill color; its alpha multiplies the mask.
    pub color: Rgba<u8>,
}

/// Draw `shadow` (if any) then `text` at every placement, on a copy of `base`.
///
/// Parts of a layer falling outside the image are dropped; a placement
/// entirely off-canvas draws nothing.
pub fn composite(
    base: &RgbaImage,
    placements: impl IntoIterator<Item = Placement>,
    shadow: Option<Paint<'_>>,
    text: Paint<'_>,
) -> RgbaImage {
    let mut canvas = base.clone();
    for anchor in placements {
        if let Some(shadow) = shadow {
            blend(&mut canvas, anchor, shadow);
        }
        blend(&mut canvas, anchor, text);
    }
    canvas
}

fn blend(canvas: &mut RgbaImage, anchor: Placement, paint: Paint<'_>) {
    let layer = paint.layer;
    let left = anchor.x + layer.offset.0;
    let top = anchor.y + layer.offset.1;

    // Visible window of the layer, in layer coordinates.
    let x0 = (-left).max(0);
    let y0 = (-top).max(0);
    let x1 = i64::from(layer.width()).min(i64::from(canvas.width()) - left);
    let y1 = i64::from(layer.height()).min(i64::from(canvas.height()) - top);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let tint = u32::from(paint.color.0[3]);
    for ly in y0..y1 {
        for lx in x0..x1 {
            let coverage = u32::from(layer.alpha.get_pixel(lx as u32, ly as u32).0[0]);
            let a = div255(coverage * tint);
            if a == 0 {
                continue;
            }
            let dst = canvas.get_pixel_mut((left + lx) as u32, (top + ly) as u32);
            *dst = over(paint.color, a, *dst);
        }
    }
}

/// Blend `src` color at effective alpha `a` (0–255) over `dst`.
fn over(src: Rgba<u8>, a: u32, dst: Rgba<u8>) -> Rgba<u8> {
    let inv = 255 - a;
    let channel = |s: u8, d: u8| div255(u32::from(s) * a + u32::from(d) * inv) as u8;
    Rgba([
        channel(src.0[0], dst.0[0]),
        channel(src.0[1], dst.0[1]),
        channel(src.0[2], dst.0[2]),
        (a + div255(u32::from(dst.0[3]) * inv)) as u8,
    ])
}

/// `v / 255` rounded to nearest, for `v ≤ 255 × 255`.
fn div255(v: u32) -> u32 {
    (v + 127) / 255
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

    fn solid_layer(w: u32, h: u32, alpha: u8, offset: (i64, i64)) -> MaskLayer {
        MaskLayer {
            alpha: GrayImage::from_pixel(w, h, Luma([alpha])),
            offset,
        }
    }

    fn grey(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_pixel(w, h, Rgba([100, 100, 100, 255]))
    }

    #[test]
    fn opaque_text_replaces_pixels() {
        let base = grey(4, 4);
        let layer = solid_layer(2, 2, 255, (0, 0));
        let out = composite(
            &base,
            [Placement::new(1, 1)],
            None,
            Paint {
                layer: &layer,
                color: WHITE,
            },
        );

        assert_eq!(*out.get_pixel(1, 1), WHITE);
        assert_eq!(*out.get_pixel(2, 2), WHITE);
        assert_eq!(*out.get_pixel(0, 0), Rgba([100, 100, 100, 255]));
        assert_eq!(*out.get_pixel(3, 3), Rgba([100, 100, 100, 255]));
    }

    #[test]
    fn half_alpha_blends_halfway() {
        let base = RgbaImage::from_pixel(1, 1, BLACK);
        let layer = solid_layer(1, 1, 255, (0, 0));
        let out = composite(
            &base,
            [Placement::new(0, 0)],
            None,
            Paint {
                layer: &layer,
                color: Rgba([255, 255, 255, 128]),
            },
        );
        assert_eq!(*out.get_pixel(0, 0), Rgba([128, 128, 128, 255]));
    }

    #[test]
    fn blending_onto_transparent_accumulates_alpha() {
        let base = RgbaImage::new(1, 1);
        let layer = solid_layer(1, 1, 255, (0, 0));
        let out = composite(
            &base,
            [Placement::new(0, 0)],
            None,
            Paint {
                layer: &layer,
                color: Rgba([255, 0, 0, 100]),
            },
        );
        assert_eq!(out.get_pixel(0, 0).0[3], 100);
    }

    #[test]
    fn shadow_is_drawn_beneath_text() {
        let base = grey(6, 6);
        let text = solid_layer(2, 2, 255, (0, 0));
        let shadow = solid_layer(2, 2, 255, (1, 1));
        let out = composite(
            &base,
            [Placement::new(0, 0)],
            Some(Paint {
                layer: &shadow,
                color: BLACK,
            }),
            Paint {
                layer: &text,
                color: WHITE,
            },
        );

        // Overlap pixel: text wins
        assert_eq!(*out.get_pixel(1, 1), WHITE);
        // Shadow-only pixel
        assert_eq!(*out.get_pixel(2, 2), BLACK);
        assert_eq!(*out.get_pixel(0, 0), WHITE);
    }

    #[test]
    fn layer_offset_shifts_the_draw() {
        let base = grey(5, 5);
        let layer = solid_layer(1, 1, 255, (-1, 2));
        let out = composite(
            &base,
            [Placement::new(2, 0)],
            None,
            Paint {
                layer: &layer,
                color: WHITE,
            },
        );
        assert_eq!(*out.get_pixel(1, 2), WHITE);
    }

    #[test]
    fn partially_offscreen_layers_are_clipped() {
        let base = grey(4, 4);
        let layer = solid_layer(3, 3, 255, (0, 0));
        let out = composite(
            &base,
            [Placement::new(-2, 3), Placement::new(3, -1)],
            None,
            Paint {
                layer: &layer,
                color: WHITE,
            },
        );
        assert_eq!(*out.get_pixel(0, 3), WHITE);
        assert_eq!(*out.get_pixel(3, 0), WHITE);
        assert_eq!(*out.get_pixel(3, 1), WHITE);
        assert_eq!(*out.get_pixel(1, 1), Rgba([100, 100, 100, 255]));
    }

    #[test]
    fn fully_offscreen_placements_are_no_ops() {
        let base = grey(4, 4);
        let layer = solid_layer(2, 2, 255, (0, 0));
        let out = composite(
            &base,
            [
                Placement::new(10, 0),
                Placement::new(0, 10),
                Placement::new(-5, -5),
            ],
            None,
            Paint {
                layer: &layer,
                color: WHITE,
            },
        );
        assert_eq!(out, base);
    }

    #[test]
    fn base_image_is_not_modified() {
        let base = grey(3, 3);
        let before = base.clone();
        let layer = solid_layer(3, 3, 255, (0, 0));
        let _ = composite(
            &base,
            [Placement::new(0, 0)],
            None,
            Paint {
                layer: &layer,
                color: WHITE,
            },
        );
        assert_eq!(base, before);
    }

    #[test]
    fn empty_layer_draws_nothing() {
        let base = grey(3, 3);
        let layer = solid_layer(0, 0, 255, (0, 0));
        let out = composite(
            &base,
            [Placement::new(1, 1)],
            None,
            Paint {
                layer: &layer,
                color: WHITE,
            },
        );
        assert_eq!(out, base);
    }
}
