//! Image I/O: decode photos into RGBA buffers and encode watermarked copies.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode** | `image::ImageReader` with format sniffing |
//! | **Orientation** | EXIF orientation applied on load |
//! | **Encode** | per-extension encoder, JPEG at quality 95 |
//!
//! The module is split into:
//! - **Backend**: [`ImageBackend`] trait, the seam the batch runner talks to
//! - **Rust backend**: [`RustBackend`], the production implementation

pub mod backend;
pub mod rust_backend;

pub use backend::{BackendError, ImageBackend};
pub use rust_backend::{RustBackend, supported_input_extensions};
