//! # wmark
//!
//! Batch text watermarking for photo folders. Point it at a directory of
//! photos and it writes a watermarked copy of each one, keeping the original
//! format and name with a `_wm` suffix.
//!
//! # Architecture: Engine Plus Thin Collaborators
//!
//! All of the interesting work happens in one pure engine; everything around
//! it is I/O plumbing:
//!
//! ```text
//! watermark.toml + flags ─► config ─► Watermark ─┐
//! --font ─────────────────► font ─► FontResource ┤
//! pics/*.jpg ─► imaging::load ─► RgbaImage ──────┴─► watermark::apply ─► imaging::save ─► output/*_wm.jpg
//! ```
//!
//! - **Engine purity**: [`watermark::apply`] takes pixels and parameters and
//!   returns pixels. It never reads files, so it is tested without fonts or
//!   images on disk.
//! - **Shared, read-only resources**: the font and the resolved watermark are
//!   built once per run and shared by reference with every rayon worker.
//! - **Per-file isolation**: a photo that cannot be decoded or written is
//!   reported and skipped; the rest of the batch still runs.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`watermark`] | The engine: font sizing, layout, stroke and shadow, compositing |
//! | [`font`] | Font file loading and glyph rasterization via `fontdue` |
//! | [`imaging`] | Decode photos (EXIF-upright) and encode watermarked copies |
//! | [`process`] | Discovery, parallel batch run, per-file outcomes, progress events |
//! | [`config`] | Layered `watermark.toml` loading, merging and validation |
//! | [`naming`] | Supported extensions and `stem_wm.ext` output names |
//! | [`cache`] | Skip photos whose source and settings are unchanged |
//! | [`output`] | CLI output formatting for progress and the run summary |
//!
//! # Design Decisions
//!
//! ## Pure-Rust Font Rendering
//!
//! Glyphs are rasterized with `fontdue` rather than FreeType or a system text
//! stack, so the binary has no system dependencies and the same font renders
//! the same pixels on every machine. That determinism is also what makes the
//! output cache sound: equal inputs give byte-identical outputs.
//!
//! ## Masks, Not Text Layers
//!
//! The text is rasterized once per photo into an 8-bit coverage mask. Stroke
//! and shadow are derived from that mask (dilation, alpha scaling, Gaussian
//! blur) and composited with integer "over" blending. Tiled modes reuse the
//! same masks at every placement.
//!
//! ## Content-Addressed Cache
//!
//! Reruns compare a hash of each source file and a hash of the resolved
//! settings (including the font file) against a manifest in the output
//! directory. Unchanged photos are not decoded at all.

pub mod cache;
pub mod config;
pub mod font;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod process;
pub mod watermark;

#[cfg(test)]
pub(crate) mod test_helpers;
