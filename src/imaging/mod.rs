//! Imaging subsystem.
//!
//! # Data Flow
//! ```text
//! raw bytes + ImageRole
//!     → crop.rs (decode, decide whether a cover crop is needed)
//!     → face.rs (largest face, only when cropping)
//!     → crop.rs (pick strip, clamp, re-encode JPEG q90)
//! ```
//!
//! # Design Decisions
//! - Face detection is a trait object so the model backend can be swapped
//! - Detection failures mean "no face", decode failures fail the request
//! - All work here is CPU-bound and runs on blocking threads

pub mod crop;
pub mod face;
pub mod role;
#[cfg(feature = "seeta")]
pub mod seeta;

pub use crop::{plan_crop, transform, CropRect, ImageError, Transformed, JPEG_QUALITY};
pub use face::{build_detector, detect_largest_face, FaceBox, FaceDetector, FaceRect, NoFaceDetector};
pub use role::ImageRole;
