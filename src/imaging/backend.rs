//! Image I/O backend trait and shared types.
//!
//! The [`ImageBackend`] trait covers the two operations the batch pipeline
//! needs from the outside world: decode a photo into RGBA pixels, and encode
//! a watermarked buffer back to disk in the source's format.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests swap in a mock
//! that records operations and serves canned images.

use image::RgbaImage;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {path}: {message}")]
    Decode { path: String, message: String },
    #[error("Failed to encode {path}: {message}")]
    Encode { path: String, message: String },
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),
}

/// Trait for image I/O backends.
///
/// Must be `Sync`: one backend is shared by every rayon worker.
pub trait ImageBackend: Sync {
    /// Decode an image, upright (EXIF orientation applied), as RGBA8.
    fn load(&self, path: &Path) -> Result<RgbaImage, BackendError>;

    /// Encode `image` to `path`, choosing the format from the extension.
    fn save(&self, image: &RgbaImage, path: &Path) -> Result<(), BackendError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::Mutex;

    /// Mock backend that serves canned images and records saves.
    /// Uses Mutex (not RefCell) so it is Sync and works with rayon's par_iter.
    #[derive(Default)]
    pub struct MockBackend {
        pub images: HashMap<PathBuf, RgbaImage>,
        pub operations: Mutex<Vec<RecordedOp>>,
        pub saved: Mutex<HashMap<PathBuf, RgbaImage>>,
        /// Output paths whose save should fail.
        pub failing_saves: Vec<PathBuf>,
    }

    #[derive(Debug, Clone, PartialEq)]
    pub enum RecordedOp {
        Load(String),
        Save {
            output: String,
            width: u32,
            height: u32,
        },
    }

    impl MockBackend {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_image(mut self, path: impl Into<PathBuf>, image: RgbaImage) -> Self {
            self.images.insert(path.into(), image);
            self
        }

        pub fn failing_save(mut self, path: impl Into<PathBuf>) -> Self {
            self.failing_saves.push(path.into());
            self
        }

        pub fn get_operations(&self) -> Vec<RecordedOp> {
            self.operations.lock().unwrap().clone()
        }

        pub fn saved_image(&self, path: &Path) -> Option<RgbaImage> {
            self.saved.lock().unwrap().get(path).cloned()
        }
    }

    impl ImageBackend for MockBackend {
        fn load(&self, path: &Path) -> Result<RgbaImage, BackendError> {
            self.operations
                .lock()
                .unwrap()
                .push(RecordedOp::Load(path.to_string_lossy().to_string()));

            self.images
                .get(path)
                .cloned()
                .ok_or_else(|| BackendError::Decode {
                    path: path.display().to_string(),
                    message: "no mock image".to_string(),
                })
        }

        fn save(&self, image: &RgbaImage, path: &Path) -> Result<(), BackendError> {
            self.operations.lock().unwrap().push(RecordedOp::Save {
                output: path.to_string_lossy().to_string(),
                width: image.width(),
                height: image.height(),
            });
            if self.failing_saves.iter().any(|p| p == path) {
                return Err(BackendError::Encode {
                    path: path.display().to_string(),
                    message: "mock save failure".to_string(),
                });
            }
            self.saved
                .lock()
                .unwrap()
                .insert(path.to_path_buf(), image.clone());
            Ok(())
        }
    }

    #[test]
    fn mock_serves_registered_images() {
        let backend = MockBackend::new().with_image("/in/a.png", RgbaImage::new(8, 6));

        let img = backend.load(Path::new("/in/a.png")).unwrap();
        assert_eq!(img.dimensions(), (8, 6));

        let ops = backend.get_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], RecordedOp::Load(p) if p == "/in/a.png"));
    }

    #[test]
    fn mock_unknown_image_is_decode_error() {
        let backend = MockBackend::new();
        let result = backend.load(Path::new("/in/missing.png"));
        assert!(matches!(result, Err(BackendError::Decode { .. })));
    }

    #[test]
    fn mock_records_saves() {
        let backend = MockBackend::new();
        backend
            .save(&RgbaImage::new(4, 2), Path::new("/out/a_wm.png"))
            .unwrap();

        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Save {
                width: 4,
                height: 2,
                ..
            }
        ));
        assert!(backend.saved_image(Path::new("/out/a_wm.png")).is_some());
    }

    #[test]
    fn mock_failing_save() {
        let backend = MockBackend::new().failing_save("/out/bad_wm.png");
        let result = backend.save(&RgbaImage::new(1, 1), Path::new("/out/bad_wm.png"));
        assert!(matches!(result, Err(BackendError::Encode { .. })));
    }
}
