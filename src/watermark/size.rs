//! Font size derivation from image geometry.
//!
//! A watermark is either drawn at a fixed pixel size or scaled against one
//! of five geometric metrics of the photo, so a batch of mixed resolutions
//! gets visually consistent marks.

use super::InvalidConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which image measurement the font ratio is multiplied against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Fit {
    /// Longer edge.
    Long,
    /// Shorter edge.
    Short,
    Width,
    Height,
    /// Diagonal, `sqrt(w² + h²)`.
    Diag,
}

impl Fit {
    pub const ALL: [Fit; 5] = [Fit::Long, Fit::Short, Fit::Width, Fit::Height, Fit::Diag];

    pub fn name(self) -> &'static str {
        match self {
            Fit::Long => "long",
            Fit::Short => "short",
            Fit::Width => "width",
            Fit::Height => "height",
            Fit::Diag => "diag",
        }
    }

    /// The basis metric for an image of `width` × `height`.
    pub fn basis(self, width: u32, height: u32) -> f64 {
        let (w, h) = (width as f64, height as f64);
        match self {
            Fit::Long => w.max(h),
            Fit::Short => w.min(h),
            Fit::Width => w,
            Fit::Height => h,
            Fit::Diag => w.hypot(h),
        }
    }
}

impl FromStr for Fit {
    type Err = InvalidConfig;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Fit::ALL
            .into_iter()
            .find(|f| f.name() == s)
            .ok_or_else(|| {
                InvalidConfig(format!(
                    "unknown fit '{s}' (expected one of: long, short, width, height, diag)"
                ))
            })
    }
}

impl TryFrom<String> for Fit {
    type Error = InvalidConfig;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fit> for String {
    fn from(fit: Fit) -> Self {
        fit.name().to_string()
    }
}

impl fmt::Display for Fit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How the rendered font size is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum SizingRule {
    /// Exact pixel size, independent of the image.
    Fixed(u32),
    /// `round(fit.basis(w, h) × ratio)`.
    Ratio { ratio: f64, fit: Fit },
}

/// Resolve the font pixel size for an image of `width` × `height`.
///
/// Ratio-based sizes never go below 1px.
pub fn resolve_font_size(rule: &SizingRule, width: u32, height: u32) -> Result<u32, InvalidConfig> {
    match *rule {
        SizingRule::Fixed(0) => Err(InvalidConfig("font size must be at least 1px".into())),
        SizingRule::Fixed(px) => Ok(px),
        SizingRule::Ratio { ratio, fit } => {
            if !ratio.is_finite() || ratio <= 0.0 {
                return Err(InvalidConfig(format!(
                    "font ratio must be greater than 0 (got {ratio})"
                )));
            }
            let size = (fit.basis(width, height) * ratio).round();
            Ok((size as u32).max(1))
        }
    }
}
