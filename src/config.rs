//! Watermark configuration module.
//!
//! Handles loading, validating, and merging `watermark.toml` files.
//! Configuration is layered: stock defaults are overridden by a config file,
//! which is in turn overridden by flags given on the command line.
//!
//! ## Config File Location
//!
//! By default the file is looked up inside the input directory; `--config`
//! points at one anywhere else:
//!
//! ```text
//! pics/
//! ├── watermark.toml       # Optional (overrides stock defaults)
//! ├── beach.jpg
//! └── harbour.png
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! text = "sample"
//! mode = "bottom-right"     # bottom-right, center, tile, diagonal-tile
//! opacity = 128             # Text alpha (0-255)
//! margin_ratio = 0.02       # Bottom-right inset, fraction of the long edge
//!
//! [font]
//! # path = "fonts/MyFont.ttf"
//! index = 0                 # Face index inside a .ttc collection
//! # size = 48               # Explicit pixel size, overrides ratio/fit
//! ratio = 0.05              # Font size = ratio × fit metric
//! fit = "diag"              # long, short, width, height, diag
//!
//! [stroke]
//! width = 0                 # Pseudo-bold dilation radius in pixels (0-100)
//!
//! [shadow]
//! offset = [2, 2]
//! alpha = 180               # 0-255; 0 disables the shadow
//! blur = 0                  # Gaussian sigma in pixels (0-100)
//!
//! [tile]
//! step = [1.0, 1.0]         # Pitch as a multiple of the text box
//! diag_step = 1.5           # Extra horizontal pitch for diagonal-tile
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse; override just the values you want:
//!
//! ```toml
//! text = "© Jane Doe"
//!
//! [shadow]
//! blur = 2
//! ```
//!
//! Unknown keys are rejected to catch typos early. Out-of-range values and
//! unknown mode or fit names are reported as [`InvalidConfig`] before any
//! image is touched.

use crate::watermark::decoration::{MAX_SHADOW_BLUR, MAX_STROKE_WIDTH};
use crate::watermark::{
    Decoration, Fit, InvalidConfig, Mode, Shadow, SizingRule, Watermark,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Name of the config file looked up inside the input directory.
pub const CONFIG_FILENAME: &str = "watermark.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error(transparent)]
    Invalid(#[from] InvalidConfig),
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(InvalidConfig(message.into()))
}

/// Watermark configuration loaded from `watermark.toml`.
///
/// All fields have sensible defaults. User config files need only specify
/// the values they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WatermarkConfig {
    /// Text to draw on every image.
    pub text: String,
    /// Placement mode.
    pub mode: Mode,
    /// Alpha of the text fill.
    pub opacity: u32,
    /// Bottom-right inset as a fraction of the image's longer edge.
    pub margin_ratio: f64,
    /// Font file and sizing.
    pub font: FontConfig,
    /// Pseudo-bold stroke.
    pub stroke: StrokeConfig,
    /// Drop shadow.
    pub shadow: ShadowConfig,
    /// Tile and diagonal-tile pitch.
    pub tile: TileConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            text: "sample".to_string(),
            mode: Mode::BottomRight,
            opacity: 128,
            margin_ratio: 0.02,
            font: FontConfig::default(),
            stroke: StrokeConfig::default(),
            shadow: ShadowConfig::default(),
            tile: TileConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl WatermarkConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.text.is_empty() {
            return Err(invalid("text must not be empty"));
        }
        if self.opacity > 255 {
            return Err(invalid("opacity must be 0-255"));
        }
        if !self.margin_ratio.is_finite() || self.margin_ratio < 0.0 {
            return Err(invalid("margin_ratio must be >= 0"));
        }
        if self.font.size == Some(0) {
            return Err(invalid("font.size must be >= 1"));
        }
        if !self.font.ratio.is_finite() || self.font.ratio <= 0.0 {
            return Err(invalid("font.ratio must be > 0"));
        }
        if self.stroke.width > MAX_STROKE_WIDTH {
            return Err(invalid(format!("stroke.width must be 0-{MAX_STROKE_WIDTH}")));
        }
        if self.shadow.alpha > 255 {
            return Err(invalid("shadow.alpha must be 0-255"));
        }
        if self.shadow.blur > MAX_SHADOW_BLUR {
            return Err(invalid(format!("shadow.blur must be 0-{MAX_SHADOW_BLUR}")));
        }
        let steps = [self.tile.step[0], self.tile.step[1], self.tile.diag_step];
        if steps.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(invalid("tile.step and tile.diag_step must be > 0"));
        }
        Ok(())
    }

    /// The engine-facing watermark described by this config.
    pub fn watermark(&self) -> Result<Watermark, ConfigError> {
        self.validate()?;
        let sizing = match self.font.size {
            Some(px) => SizingRule::Fixed(px),
            None => SizingRule::Ratio {
                ratio: self.font.ratio,
                fit: self.font.fit,
            },
        };
        Ok(Watermark {
            text: self.text.clone(),
            sizing,
            mode: self.mode,
            margin_ratio: self.margin_ratio,
            tile_step: (self.tile.step[0], self.tile.step[1]),
            diag_step: self.tile.diag_step,
            decoration: Decoration {
                stroke_width: self.stroke.width,
                shadow: Shadow {
                    offset: (self.shadow.offset[0], self.shadow.offset[1]),
                    alpha: self.shadow.alpha as u8,
                    blur: self.shadow.blur,
                },
            },
            opacity: self.opacity as u8,
        })
    }
}

/// Font file and sizing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FontConfig {
    /// TTF/OTF/TTC path. When absent the bundled fallback location is tried.
    pub path: Option<String>,
    /// Face index inside a font collection.
    pub index: u32,
    /// Explicit pixel size; takes precedence over `ratio`.
    pub size: Option<u32>,
    /// Font size as a fraction of the `fit` metric.
    pub ratio: f64,
    /// Image metric the ratio applies to.
    pub fit: Fit,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            path: None,
            index: 0,
            size: None,
            ratio: 0.05,
            fit: Fit::Diag,
        }
    }
}

/// Pseudo-bold stroke settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrokeConfig {
    /// Dilation radius in pixels; 0 draws the glyphs as rasterized.
    pub width: u32,
}

/// Drop shadow settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShadowConfig {
    /// Translation `[x, y]` from the text, in pixels.
    pub offset: [i32; 2],
    /// Peak alpha of the shadow.
    pub alpha: u32,
    /// Gaussian sigma in pixels.
    pub blur: u32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            offset: [2, 2],
            alpha: 180,
            blur: 0,
        }
    }
}

/// Tile and diagonal-tile pitch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TileConfig {
    /// Pitch `[x, y]` as multiples of the text box.
    pub step: [f64; 2],
    /// Additional horizontal multiplier for diagonal-tile.
    pub diag_step: f64,
}

impl Default for TileConfig {
    fn default() -> Self {
        Self {
            step: [1.0, 1.0],
            diag_step: 1.5,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel image processing workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(WatermarkConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value. The file must exist.
pub fn read_config_file(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Load `watermark.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if no `watermark.toml` exists in the directory.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(dir: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    read_config_file(&config_path).map(Some)
}

/// Merge optional overlays (file, then command line) onto a base value, then
/// deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlays: impl IntoIterator<Item = Option<toml::Value>>,
) -> Result<WatermarkConfig, ConfigError> {
    let merged = overlays
        .into_iter()
        .flatten()
        .fold(base, merge_toml);
    check_names(&merged)?;
    let config: WatermarkConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Report unknown mode and fit names as [`InvalidConfig`].
///
/// Deserialization would reject them too, but as a TOML error.
fn check_names(value: &toml::Value) -> Result<(), ConfigError> {
    if let Some(mode) = value.get("mode").and_then(toml::Value::as_str) {
        mode.parse::<Mode>()?;
    }
    let fit = value
        .get("font")
        .and_then(|font| font.get("fit"))
        .and_then(toml::Value::as_str);
    if let Some(fit) = fit {
        fit.parse::<Fit>()?;
    }
    Ok(())
}

/// Load config from `watermark.toml` in the given directory.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(dir: &Path) -> Result<WatermarkConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let overlay = load_raw_config(dir)?;
    resolve_config(base, [overlay])
}

/// Returns a fully-commented stock `watermark.toml` with all keys and explanations.
///
/// Printed by `--print-config`.
pub fn stock_config_toml() -> &'static str {
    r##"# wmark Configuration
# ===================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file at <input dir>/watermark.toml or pass it with --config.
# Flags given on the command line override values from this file.
# Unknown keys will cause an error.

# Text drawn on every image.
text = "sample"

# Placement: "bottom-right", "center", "tile" or "diagonal-tile".
mode = "bottom-right"

# Alpha of the white text fill (0 = invisible, 255 = opaque).
opacity = 128

# Bottom-right inset as a fraction of the image's longer edge.
margin_ratio = 0.02

# ---------------------------------------------------------------------------
# Font
# ---------------------------------------------------------------------------
[font]
# TTF/OTF/TTC file. When unset, fonts/NotoSansJP-Regular.ttf is tried.
# path = "fonts/MyFont.ttf"

# Face index inside a .ttc collection.
index = 0

# Explicit pixel size. When set, ratio and fit are ignored.
# size = 48

# Font size = ratio × the image metric named by fit.
ratio = 0.05

# "long", "short", "width", "height" or "diag" (the image diagonal).
fit = "diag"

# ---------------------------------------------------------------------------
# Stroke (pseudo-bold)
# ---------------------------------------------------------------------------
[stroke]
# Grow every glyph by this many pixels (0-100). 0 disables.
width = 0

# ---------------------------------------------------------------------------
# Drop shadow
# ---------------------------------------------------------------------------
[shadow]
# Shadow translation [x, y] in pixels. [0, 0] disables the shadow.
offset = [2, 2]

# Shadow alpha (0-255). 0 disables the shadow.
alpha = 180

# Gaussian blur sigma in pixels (0-100). 0 keeps hard edges.
blur = 0

# ---------------------------------------------------------------------------
# Tiling
# ---------------------------------------------------------------------------
[tile]
# Pitch [x, y] as multiples of the text box, for tile and diagonal-tile.
step = [1.0, 1.0]

# Extra horizontal pitch multiplier for diagonal-tile.
diag_step = 1.5

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel image-processing workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
