//! Centralized file naming for inputs and watermarked outputs.
//!
//! Input files are recognized by extension alone, case-insensitively. Each
//! output keeps the source stem and extension with a `_wm` suffix on the
//! stem, written flat into the output directory:
//! - `pics/IMG_0001.JPG` → `output/IMG_0001_wm.JPG`
//! - `pics/holiday.2024.png` → `output/holiday.2024_wm.png`
//! - `pics/scan.tiff` → `output/scan_wm.tiff`

use crate::imaging::supported_input_extensions;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Suffix appended to the source stem.
pub const OUTPUT_SUFFIX: &str = "_wm";

/// Whether `path` has an extension we can decode and re-encode.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|e| supported_input_extensions().contains(&e.as_str()))
}

/// Output path for `source` inside `output_dir`.
pub fn output_path(output_dir: &Path, source: &Path) -> PathBuf {
    let mut name: OsString = source.file_stem().unwrap_or_default().to_os_string();
    name.push(OUTPUT_SUFFIX);
    if let Some(ext) = source.extension() {
        name.push(".");
        name.push(ext);
    }
    output_dir.join(name)
}
