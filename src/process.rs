//! Batch watermarking of a photo directory.
//!
//! Takes the validated [`Watermark`] and a loaded font, discovers the photos
//! directly inside the input directory, and writes one watermarked copy of
//! each into the output directory.
//!
//! ## Output Structure
//!
//! ```text
//! output/
//! ├── .watermark-cache.json   # Cache manifest (see crate::cache)
//! ├── beach_wm.jpg            # JPEG, quality 95, no alpha
//! ├── harbour_wm.png          # PNG with alpha
//! └── scan_wm.tiff
//! ```
//!
//! ## Failure Isolation
//!
//! Problems with the batch as a whole (missing input directory, output
//! directory that cannot be created) are returned as [`ProcessError`]
//! before any photo is touched. Problems with a single photo (unreadable,
//! undecodable, unwritable) are captured in that photo's [`FileOutcome`] and
//! the rest of the batch carries on.
//!
//! ## Parallel Processing
//!
//! Photos are processed in parallel using [rayon](https://docs.rs/rayon).
//! The font and watermark are shared read-only by every worker; progress is
//! reported through an optional `mpsc` channel as each photo finishes.

use crate::cache::{self, CacheEntry, CacheManifest, ParamsKey};
use crate::font::FontResource;
use crate::imaging::{BackendError, ImageBackend, RustBackend};
use crate::naming::{OUTPUT_SUFFIX, is_supported_image, output_path};
use crate::watermark::{self, InvalidConfig, TextRasterizer, Watermark};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Input directory not found: {0}")]
    NotADirectory(PathBuf),
    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Why a single photo was skipped.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("cannot read source: {0}")]
    Read(std::io::Error),
    #[error("{0}")]
    Decode(BackendError),
    #[error("{0}")]
    Render(InvalidConfig),
    #[error("{0}")]
    Write(BackendError),
}

/// Where to read from and write to.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Reuse outputs recorded in the cache manifest when nothing changed.
    pub use_cache: bool,
}

/// How a photo's output came to be up to date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    /// Rendered and encoded this run.
    Written { width: u32, height: u32 },
    /// Source and settings unchanged since the last run; output left as is.
    Cached,
}

/// Result of processing one photo.
#[derive(Debug)]
pub struct FileOutcome {
    pub source: PathBuf,
    pub output: PathBuf,
    pub result: Result<FileStatus, FileError>,
}

impl FileOutcome {
    pub fn is_skipped(&self) -> bool {
        self.result.is_err()
    }
}

/// Every outcome of a batch, in file-name order.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<FileOutcome>,
    /// Set when the cache manifest could not be written. The outputs are
    /// still on disk; the next run just re-renders them.
    pub cache_warning: Option<String>,
}

impl RunSummary {
    pub fn written(&self) -> usize {
        self.count(|r| matches!(r, Ok(FileStatus::Written { .. })))
    }

    pub fn cached(&self) -> usize {
        self.count(|r| matches!(r, Ok(FileStatus::Cached)))
    }

    pub fn skipped(&self) -> usize {
        self.count(Result::is_err)
    }

    /// Outcomes of the photos that could not be watermarked.
    pub fn failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.outcomes.iter().filter(|o| o.is_skipped())
    }

    /// True when no photo was skipped.
    pub fn is_success(&self) -> bool {
        self.skipped() == 0
    }

    fn count(&self, pred: impl Fn(&Result<FileStatus, FileError>) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.result)).count()
    }
}

/// Progress events emitted while a batch runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    /// Discovery finished; `total` photos will be processed.
    Started {
        input_dir: String,
        output_dir: String,
        total: usize,
    },
    /// A photo's output is up to date.
    FileDone {
        index: usize,
        source: String,
        output: String,
        status: FileStatus,
    },
    /// A photo could not be watermarked.
    FileSkipped {
        index: usize,
        source: String,
        reason: String,
    },
}

/// Photos directly inside `dir` with a supported extension, sorted by name.
pub fn discover_images(dir: &Path) -> Result<Vec<PathBuf>, ProcessError> {
    if !dir.is_dir() {
        return Err(ProcessError::NotADirectory(dir.to_path_buf()));
    }
    let mut images = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_file() && is_supported_image(entry.path()) {
            images.push(entry.into_path());
        }
    }
    Ok(images)
}

/// Watermark every photo in `options.input_dir` with the pure Rust backend.
pub fn process(
    options: &BatchOptions,
    watermark: &Watermark,
    font: &FontResource,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<RunSummary, ProcessError> {
    let backend = RustBackend::new();
    process_with_backend(
        &backend,
        font,
        font.fingerprint(),
        options,
        watermark,
        progress,
    )
}

/// Watermark a batch using a specific backend and rasterizer (allows testing
/// with mocks).
///
/// `font_fingerprint` identifies the rasterizer's font in the cache key.
pub fn process_with_backend(
    backend: &impl ImageBackend,
    rasterizer: &(impl TextRasterizer + ?Sized),
    font_fingerprint: &str,
    options: &BatchOptions,
    watermark: &Watermark,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<RunSummary, ProcessError> {
    let mut images = discover_images(&options.input_dir)?;
    std::fs::create_dir_all(&options.output_dir).map_err(|source| ProcessError::OutputDir {
        path: options.output_dir.clone(),
        source,
    })?;
    if same_dir(&options.input_dir, &options.output_dir) {
        // Do not watermark our own outputs again
        images.retain(|p| !is_own_output(p));
    }

    let mut manifest = if options.use_cache {
        CacheManifest::load(&options.output_dir)
    } else {
        CacheManifest::empty()
    };

    emit(
        &progress,
        ProcessEvent::Started {
            input_dir: options.input_dir.display().to_string(),
            output_dir: options.output_dir.display().to_string(),
            total: images.len(),
        },
    );

    let params = ParamsKey::new(watermark, font_fingerprint)?;
    let job = Job {
        backend,
        rasterizer,
        params: &params,
        watermark,
        output_dir: &options.output_dir,
        manifest: &manifest,
        use_cache: options.use_cache,
    };
    let results: Vec<(FileOutcome, Option<CacheEntry>)> = images
        .par_iter()
        .enumerate()
        .map(|(i, source)| {
            let (outcome, entry) = job.run(source);
            emit(&progress, outcome_event(i + 1, &outcome));
            (outcome, entry)
        })
        .collect();

    let mut summary = RunSummary::default();
    for (outcome, entry) in results {
        let name = file_name(&outcome.output);
        match entry {
            Some(entry) => manifest.insert(name, entry.source_hash, entry.params_hash),
            None => manifest.remove(&name),
        }
        summary.outcomes.push(outcome);
    }
    if let Err(e) = manifest.save(&options.output_dir) {
        summary.cache_warning = Some(format!(
            "could not write cache manifest {}: {e}",
            cache::manifest_path(&options.output_dir).display()
        ));
    }

    Ok(summary)
}

/// Shared, read-only state for the per-photo work.
struct Job<'a, B: ?Sized, R: ?Sized> {
    backend: &'a B,
    rasterizer: &'a R,
    params: &'a ParamsKey,
    watermark: &'a Watermark,
    output_dir: &'a Path,
    manifest: &'a CacheManifest,
    use_cache: bool,
}

impl<B, R> Job<'_, B, R>
where
    B: ImageBackend + ?Sized,
    R: TextRasterizer + ?Sized,
{
    /// Process one photo. The returned cache entry is `Some` when the output
    /// on disk now matches the source and settings.
    fn run(&self, source: &Path) -> (FileOutcome, Option<CacheEntry>) {
        let output = output_path(self.output_dir, source);
        let (result, entry) = match self.render(source, &output) {
            Ok((status, entry)) => (Ok(status), Some(entry)),
            Err(e) => (Err(e), None),
        };
        (
            FileOutcome {
                source: source.to_path_buf(),
                output,
                result,
            },
            entry,
        )
    }

    fn render(
        &self,
        source: &Path,
        output: &Path,
    ) -> Result<(FileStatus, CacheEntry), FileError> {
        let source_hash = cache::hash_file(source).map_err(FileError::Read)?;
        let extension = source
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        let entry = CacheEntry {
            source_hash,
            params_hash: self.params.hash_for(&extension),
        };

        if self.use_cache
            && self.manifest.is_fresh(
                &file_name(output),
                &entry.source_hash,
                &entry.params_hash,
                self.output_dir,
            )
        {
            return Ok((FileStatus::Cached, entry));
        }

        let image = self.backend.load(source).map_err(FileError::Decode)?;
        let marked =
            watermark::apply(&image, self.watermark, self.rasterizer).map_err(FileError::Render)?;
        self.backend.save(&marked, output).map_err(FileError::Write)?;

        let (width, height) = marked.dimensions();
        Ok((FileStatus::Written { width, height }, entry))
    }
}

fn outcome_event(index: usize, outcome: &FileOutcome) -> ProcessEvent {
    let source = file_name(&outcome.source);
    match &outcome.result {
        Ok(status) => ProcessEvent::FileDone {
            index,
            source,
            output: file_name(&outcome.output),
            status: *status,
        },
        Err(e) => ProcessEvent::FileSkipped {
            index,
            source,
            reason: e.to_string(),
        },
    }
}

fn emit(progress: &Option<Sender<ProcessEvent>>, event: ProcessEvent) {
    if let Some(tx) = progress {
        // A closed receiver only means nobody is listening any more
        let _ = tx.send(event);
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn is_own_output(path: &Path) -> bool {
    path.file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|s| s.ends_with(OUTPUT_SUFFIX))
}
