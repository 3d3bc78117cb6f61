//! Output cache for incremental reruns.
//!
//! Watermarking a large batch is dominated by decode and encode time. When
//! the same directory is processed again with the same settings, every
//! output would come out byte-identical, so this module lets the batch
//! runner skip files whose source and watermark parameters are unchanged.
//!
//! ## Cache keys
//!
//! Entries are keyed by output file name and record two hashes:
//!
//! - **`source_hash`**: SHA-256 of the source file contents. Content-based
//!   rather than mtime-based so it survives copies and `git checkout`.
//!
//! - **`params_hash`**: SHA-256 over everything else that shapes the output:
//!   the resolved [`Watermark`] (serialized as JSON), the font file's
//!   fingerprint, the output format and the encoder quality. Changing any
//!   setting, swapping the font, or upgrading the font file busts the entry.
//!
//! A cache hit requires:
//! 1. An entry for the output name with matching `source_hash` and `params_hash`
//! 2. The previously-written output file still exists on disk
//!
//! ## Storage
//!
//! The manifest is a JSON file at `<output_dir>/.watermark-cache.json`,
//! next to the images it describes.
//!
//! ## Bypassing the cache
//!
//! Pass `--no-cache` to start from an empty manifest. Every image is
//! re-rendered and the old outputs are overwritten.

use crate::imaging::rust_backend::JPEG_QUALITY;
use crate::watermark::Watermark;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Name of the cache manifest file within the output directory.
pub const MANIFEST_FILENAME: &str = ".watermark-cache.json";

/// Version of the cache manifest format. Bump this to invalidate all
/// existing caches when the format or key computation changes.
const MANIFEST_VERSION: u32 = 1;

/// A single cached output file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CacheEntry {
    pub source_hash: String,
    pub params_hash: String,
}

/// On-disk cache manifest mapping output file names to their cache entries.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub entries: HashMap<String, CacheEntry>,
}

impl CacheManifest {
    /// Create an empty manifest (used for `--no-cache` or the first run).
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            entries: HashMap::new(),
        }
    }

    /// Load from the output directory. Returns an empty manifest if the
    /// file doesn't exist or can't be parsed (version mismatch, corruption).
    pub fn load(output_dir: &Path) -> Self {
        let content = match std::fs::read_to_string(manifest_path(output_dir)) {
            Ok(c) => c,
            Err(_) => return Self::empty(),
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(m) if m.version == MANIFEST_VERSION => m,
            _ => Self::empty(),
        }
    }

    /// Save to the output directory.
    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(output_dir), json)
    }

    /// Whether `output_name` was written from exactly this source and these
    /// parameters, and is still on disk.
    pub fn is_fresh(
        &self,
        output_name: &str,
        source_hash: &str,
        params_hash: &str,
        output_dir: &Path,
    ) -> bool {
        self.entries.get(output_name).is_some_and(|entry| {
            entry.source_hash == source_hash && entry.params_hash == params_hash
        }) && output_dir.join(output_name).is_file()
    }

    /// Record the hashes an output file was produced from.
    pub fn insert(&mut self, output_name: String, source_hash: String, params_hash: String) {
        self.entries.insert(
            output_name,
            CacheEntry {
                source_hash,
                params_hash,
            },
        );
    }

    /// Forget an output (its last write failed, so the file on disk is stale).
    pub fn remove(&mut self, output_name: &str) {
        self.entries.remove(output_name);
    }
}

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Sha256::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// Everything besides the source pixels that determines an output file.
///
/// Built once per run from the resolved [`Watermark`] and the font's
/// fingerprint; [`ParamsKey::hash_for`] then mixes in the output format.
#[derive(Debug, Clone)]
pub struct ParamsKey {
    watermark_json: Vec<u8>,
    font_fingerprint: String,
}

impl ParamsKey {
    pub fn new(watermark: &Watermark, font_fingerprint: &str) -> serde_json::Result<Self> {
        Ok(Self {
            watermark_json: serde_json::to_vec(watermark)?,
            font_fingerprint: font_fingerprint.to_string(),
        })
    }

    /// SHA-256 params hash for an output with the given file extension.
    ///
    /// The extension is lowercased so `A.JPG` and `a.jpg` hash alike.
    pub fn hash_for(&self, extension: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(b"watermark\0");
        hasher.update(&self.watermark_json);
        hasher.update(b"\0font\0");
        hasher.update(self.font_fingerprint.as_bytes());
        hasher.update(b"\0format\0");
        hasher.update(extension.to_ascii_lowercase().as_bytes());
        hasher.update([JPEG_QUALITY]);
        format!("{:x}", hasher.finalize())
    }
}

/// Resolve the cache manifest path for an output directory.
pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}
