//! CLI output formatting for a watermarking run.
//!
//! # Information-First Display
//!
//! Every photo is shown by its position in the batch and its file name, with
//! the result as context: where the copy went, whether it came from the
//! cache, or why it was skipped. Paths are relative to the input and output
//! directories announced in the header.
//!
//! # Output Format
//!
//! ```text
//! Watermarking 3 photos: pics → output
//!     001 beach.jpg → beach_wm.jpg (4032×3024)
//!     002 broken.jpg: skipped
//!         Reason: Failed to decode pics/broken.jpg: ...
//!     003 harbour.png → harbour_wm.png (cached)
//!
//! Done: 1 written, 1 cached, 1 skipped
//! Skipped:
//!     broken.jpg: Failed to decode pics/broken.jpg: ...
//! Warning: could not write cache manifest output/.watermark-cache.json: ...
//! ```
//!
//! Progress lines arrive in completion order, so with several workers the
//! indices can interleave; the summary is always in file-name order.
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects.

use crate::process::{FileStatus, ProcessEvent, RunSummary};
use std::path::Path;

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn plural(n: usize, word: &str) -> String {
    if n == 1 {
        format!("{n} {word}")
    } else {
        format!("{n} {word}s")
    }
}

// ============================================================================
// Progress
// ============================================================================

/// Format a single progress event as display lines.
pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::Started {
            input_dir,
            output_dir,
            total,
        } => vec![format!(
            "Watermarking {}: {} → {}",
            plural(*total, "photo"),
            input_dir,
            output_dir
        )],
        ProcessEvent::FileDone {
            index,
            source,
            output,
            status,
        } => {
            let detail = match status {
                FileStatus::Written { width, height } => format!("{width}×{height}"),
                FileStatus::Cached => "cached".to_string(),
            };
            vec![format!(
                "{}{} {} → {} ({})",
                indent(1),
                format_index(*index),
                source,
                output,
                detail
            )]
        }
        ProcessEvent::FileSkipped {
            index,
            source,
            reason,
        } => vec![
            format!("{}{} {}: skipped", indent(1), format_index(*index), source),
            format!("{}Reason: {}", indent(2), reason),
        ],
    }
}

// ============================================================================
// Summary
// ============================================================================

/// Format the end-of-run summary, listing every skipped photo.
pub fn format_summary(summary: &RunSummary, input_dir: &Path) -> Vec<String> {
    if summary.outcomes.is_empty() {
        return vec![format!("No photos found in {}", input_dir.display())];
    }

    let mut lines = vec![
        String::new(),
        format!(
            "Done: {} written, {} cached, {} skipped",
            summary.written(),
            summary.cached(),
            summary.skipped()
        ),
    ];

    if !summary.is_success() {
        lines.push("Skipped:".to_string());
        for outcome in summary.failures() {
            let name = outcome
                .source
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_else(|| outcome.source.display().to_string());
            if let Err(e) = &outcome.result {
                lines.push(format!("{}{}: {}", indent(1), name, e));
            }
        }
    }
    if let Some(warning) = &summary.cache_warning {
        lines.push(format!("Warning: {warning}"));
    }
    lines
}

/// Print the end-of-run summary to stdout.
pub fn print_summary(summary: &RunSummary, input_dir: &Path) {
    for line in format_summary(summary, input_dir) {
        println!("{}", line);
    }
}

// ============================================================================
// Tests
// ============================================================================
