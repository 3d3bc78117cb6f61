//! Placement of the watermark on the canvas.
//!
//! Given the image size and the text bounding box, produce every top-left
//! anchor at which the text is drawn. Single-anchor modes yield one
//! placement; the tiling modes yield a grid that deliberately overshoots
//! the right and bottom edges so the pattern stays uniform at the border.
//! Overshooting anchors are clipped by the compositor, never dropped here.
//!
//! ```text
//! tile                      diagonal-tile
//! ┌────────────────┐        ┌────────────────┐
//! │AAA AAA AAA AAA │        │AAAAA     AAAAA │
//! │AAA AAA AAA AAA │        │AA     AAAAA    A│
//! │AAA AAA AAA AAA │        │AAAAA     AAAAA │
//! └────────────────┘        └────────────────┘
//! ```
//!
//! The sequence is a lazy, cloneable iterator: cloning it (or calling
//! [`placements`] again with the same arguments) restarts it and yields the
//! identical sequence.

use super::InvalidConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where the watermark goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Mode {
    BottomRight,
    Center,
    Tile,
    /// Tile grid with every other row shifted half a cell (brick pattern).
    DiagonalTile,
}

impl Mode {
    pub const ALL: [Mode; 4] = [
        Mode::BottomRight,
        Mode::Center,
        Mode::Tile,
        Mode::DiagonalTile,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Mode::BottomRight => "bottom-right",
            Mode::Center => "center",
            Mode::Tile => "tile",
            Mode::DiagonalTile => "diagonal-tile",
        }
    }
}

impl FromStr for Mode {
    type Err = InvalidConfig;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Mode::ALL
            .into_iter()
            .find(|m| m.name() == s)
            .ok_or_else(|| {
                InvalidConfig(format!(
                    "unknown mode '{s}' (expected one of: bottom-right, center, tile, diagonal-tile)"
                ))
            })
    }
}

impl TryFrom<String> for Mode {
    type Error = InvalidConfig;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.name().to_string()
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Top-left anchor of one drawn copy of the text, in image coordinates.
///
/// Coordinates are signed: staggered rows start left of the canvas and
/// centered text larger than the image starts above/left of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
}

impl Placement {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Everything the layout engine needs besides the two sizes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutParams {
    pub mode: Mode,
    /// Inset from the right and bottom edges in bottom-right mode.
    pub margin: u32,
    /// Horizontal / vertical multipliers on the text box for the tile pitch.
    pub tile_step: (f64, f64),
    /// Extra horizontal multiplier for diagonal-tile.
    pub diag_step: f64,
}

impl LayoutParams {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            margin: 0,
            tile_step: (1.0, 1.0),
            diag_step: 1.5,
        }
    }
}

/// Compute the placement sequence for an image of `image` size `(w, h)`
/// carrying text whose bounding box is `text` `(w, h)`.
pub fn placements(
    params: &LayoutParams,
    image: (u32, u32),
    text: (u32, u32),
) -> Result<Placements, InvalidConfig> {
    check_step("tile step x", params.tile_step.0)?;
    check_step("tile step y", params.tile_step.1)?;
    check_step("diagonal step", params.diag_step)?;

    let (w, h) = (i64::from(image.0), i64::from(image.1));
    let (tw, th) = (i64::from(text.0), i64::from(text.1));
    let margin = i64::from(params.margin);

    let inner = match params.mode {
        Mode::BottomRight => Inner::Single(Some(Placement::new(
            (w - margin - tw).max(0),
            (h - margin - th).max(0),
        ))),
        Mode::Center => Inner::Single(Some(Placement::new(
            (w - tw).div_euclid(2),
            (h - th).div_euclid(2),
        ))),
        Mode::Tile => {
            let pitch = (
                pitch(tw, params.tile_step.0),
                pitch(th, params.tile_step.1),
            );
            Inner::Grid(Grid::new(w, h, pitch, 0))
        }
        Mode::DiagonalTile => {
            let pitch_x = pitch(tw, params.tile_step.0 * params.diag_step);
            let pitch_y = pitch(th, params.tile_step.1);
            Inner::Grid(Grid::new(w, h, (pitch_x, pitch_y), pitch_x / 2))
        }
    };
    Ok(Placements { inner })
}

fn check_step(name: &str, step: f64) -> Result<(), InvalidConfig> {
    if step.is_finite() && step > 0.0 {
        Ok(())
    } else {
        Err(InvalidConfig(format!("{name} must be greater than 0 (got {step})")))
    }
}

/// Grid pitch along one axis, never below one pixel.
fn pitch(extent: i64, step: f64) -> i64 {
    ((extent as f64 * step).floor() as i64).max(1)
}

/// Lazy placement sequence returned by [`placements`].
#[derive(Debug, Clone)]
pub struct Placements {
    inner: Inner,
}

#[derive(Debug, Clone)]
enum Inner {
    Single(Option<Placement>),
    Grid(Grid),
}

#[derive(Debug, Clone)]
struct Grid {
    width: i64,
    height: i64,
    pitch_x: i64,
    pitch_y: i64,
    /// Leftward shift applied to odd rows.
    stagger: i64,
    row: i64,
    x: i64,
}

impl Grid {
    fn new(width: i64, height: i64, (pitch_x, pitch_y): (i64, i64), stagger: i64) -> Self {
        Self {
            width,
            height,
            pitch_x,
            pitch_y,
            stagger,
            row: 0,
            x: 0,
        }
    }

    fn row_start(&self, row: i64) -> i64 {
        if row % 2 == 1 { -self.stagger } else { 0 }
    }
}

impl Iterator for Placements {
    type Item = Placement;

    fn next(&mut self) -> Option<Placement> {
        match &mut self.inner {
            Inner::Single(slot) => slot.take(),
            Inner::Grid(grid) => loop {
                let y = grid.row * grid.pitch_y;
                if y >= grid.height {
                    return None;
                }
                if grid.x >= grid.width {
                    grid.row += 1;
                    grid.x = grid.row_start(grid.row);
                    continue;
                }
                let placement = Placement::new(grid.x, y);
                grid.x += grid.pitch_x;
                return Some(placement);
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(params: &LayoutParams, image: (u32, u32), text: (u32, u32)) -> Vec<Placement> {
        placements(params, image, text).unwrap().collect()
    }

    fn tile(step: (f64, f64)) -> LayoutParams {
        LayoutParams {
            tile_step: step,
            ..LayoutParams::new(Mode::Tile)
        }
    }

    fn diagonal(diag_step: f64) -> LayoutParams {
        LayoutParams {
            diag_step,
            ..LayoutParams::new(Mode::DiagonalTile)
        }
    }

    // =========================================================================
    // Mode names
    // =========================================================================

    #[test]
    fn mode_parses_known_names() {
        for mode in Mode::ALL {
            assert_eq!(mode.name().parse::<Mode>().unwrap(), mode);
        }
    }

    #[test]
    fn mode_rejects_diagonal() {
        let err = "diagonal".parse::<Mode>().unwrap_err();
        assert!(err.to_string().contains("unknown mode 'diagonal'"));
    }

    // =========================================================================
    // Single-anchor modes
    // =========================================================================

    #[test]
    fn center_anchor_is_floor_divided() {
        let p = collect(&LayoutParams::new(Mode::Center), (100, 100), (20, 10));
        assert_eq!(p, vec![Placement::new(40, 45)]);
    }

    #[test]
    fn center_odd_remainder_floors() {
        let p = collect(&LayoutParams::new(Mode::Center), (101, 100), (20, 11));
        assert_eq!(p, vec![Placement::new(40, 44)]);
    }

    #[test]
    fn bottom_right_respects_margin() {
        let params = LayoutParams {
            margin: 8,
            ..LayoutParams::new(Mode::BottomRight)
        };
        let p = collect(&params, (200, 100), (50, 20));
        assert_eq!(p, vec![Placement::new(142, 72)]);
    }

    #[test]
    fn bottom_right_clamps_oversized_text_to_origin() {
        let params = LayoutParams {
            margin: 4,
            ..LayoutParams::new(Mode::BottomRight)
        };
        let p = collect(&params, (30, 20), (80, 40));
        assert_eq!(p, vec![Placement::new(0, 0)]);
    }

    #[test]
    fn bottom_right_never_negative() {
        let params = LayoutParams {
            margin: 20,
            ..LayoutParams::new(Mode::BottomRight)
        };
        for (iw, ih, tw, th) in [(10, 10, 5, 5), (100, 5, 10, 10), (5, 100, 10, 1)] {
            for p in collect(&params, (iw, ih), (tw, th)) {
                assert!(p.x >= 0 && p.y >= 0, "{p:?} for {iw}x{ih} / {tw}x{th}");
            }
        }
    }

    // =========================================================================
    // Tile
    // =========================================================================

    #[test]
    fn tile_starts_at_origin_and_steps_by_text_box() {
        let p = collect(&tile((1.0, 1.0)), (50, 25), (20, 10));
        let expected: Vec<Placement> = [0, 10, 20]
            .iter()
            .flat_map(|&y| [0, 20, 40].map(|x| Placement::new(x, y)))
            .collect();
        assert_eq!(p, expected);
    }

    #[test]
    fn tile_overshoots_the_edge() {
        // Last column starts at 40 and extends to 60, past the 50px canvas.
        let p = collect(&tile((1.0, 1.0)), (50, 10), (20, 10));
        assert_eq!(p.last(), Some(&Placement::new(40, 0)));
    }

    #[test]
    fn doubling_tile_step_halves_columns() {
        let text = (10, 10);
        let base = collect(&tile((1.0, 1.0)), (200, 10), text).len();
        let doubled = collect(&tile((2.0, 1.0)), (200, 10), text).len();
        assert_eq!(base, 20);
        assert_eq!(doubled, 10);
    }

    #[test]
    fn doubling_tile_step_halves_rows() {
        let text = (10, 10);
        let base = collect(&tile((1.0, 1.0)), (10, 200), text).len();
        let doubled = collect(&tile((1.0, 2.0)), (10, 200), text).len();
        assert_eq!(base, 20);
        assert_eq!(doubled, 10);
    }

    #[test]
    fn zero_sized_text_still_terminates() {
        let p = collect(&tile((1.0, 1.0)), (3, 2), (0, 0));
        assert_eq!(p.len(), 6);
    }

    // =========================================================================
    // Diagonal tile
    // =========================================================================

    #[test]
    fn diagonal_staggers_odd_rows_by_half_a_cell() {
        // pitch_x = 20 * 1.5 = 30, stagger 15
        let p = collect(&diagonal(1.5), (60, 20), (20, 10));
        assert_eq!(
            p,
            vec![
                Placement::new(0, 0),
                Placement::new(30, 0),
                Placement::new(-15, 10),
                Placement::new(15, 10),
                Placement::new(45, 10),
            ]
        );
    }

    #[test]
    fn doubling_diag_step_halves_columns() {
        let text = (10, 10);
        let base = collect(&diagonal(1.0), (400, 10), text).len();
        let doubled = collect(&diagonal(2.0), (400, 10), text).len();
        assert_eq!(base, 40);
        assert_eq!(doubled, 20);
    }

    #[test]
    fn grid_sequences_are_restartable() {
        let seq = placements(&diagonal(1.5), (317, 211), (23, 9)).unwrap();
        let first: Vec<_> = seq.clone().collect();
        let second: Vec<_> = seq.collect();
        let third: Vec<_> = placements(&diagonal(1.5), (317, 211), (23, 9))
            .unwrap()
            .collect();
        assert_eq!(first, second);
        assert_eq!(first, third);
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn non_positive_steps_are_invalid() {
        assert!(placements(&tile((0.0, 1.0)), (10, 10), (2, 2)).is_err());
        assert!(placements(&tile((1.0, -1.0)), (10, 10), (2, 2)).is_err());
        assert!(placements(&diagonal(0.0), (10, 10), (2, 2)).is_err());
        assert!(placements(&diagonal(f64::INFINITY), (10, 10), (2, 2)).is_err());
    }

    #[test]
    fn steps_are_checked_for_every_mode() {
        let params = LayoutParams {
            diag_step: -1.0,
            ..LayoutParams::new(Mode::Center)
        };
        assert!(placements(&params, (10, 10), (2, 2)).is_err());
    }
}
