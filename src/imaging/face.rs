//! Face detection capability.
//!
//! Detection only steers where a cover is cropped, so it is best effort: a
//! backend error is logged and treated exactly like an image with no faces.

use std::sync::Arc;

use image::{DynamicImage, GrayImage};
use thiserror::Error;

use crate::config::FaceDetectionConfig;

/// Axis-aligned face rectangle in source pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceRect {
    pub left: i64,
    pub top: i64,
    pub right: i64,
    pub bottom: i64,
}

impl FaceRect {
    pub fn from_xywh(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            left: x,
            top: y,
            right: x + width,
            bottom: y + height,
        }
    }

    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    pub fn height(&self) -> i64 {
        self.bottom - self.top
    }

    pub fn area(&self) -> i64 {
        self.width().saturating_mul(self.height())
    }
}

/// Result of face detection: either a face or an explicit "none found".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaceBox {
    #[default]
    None,
    Found(FaceRect),
}

impl FaceBox {
    pub fn rect(&self) -> Option<&FaceRect> {
        match self {
            FaceBox::Found(rect) => Some(rect),
            FaceBox::None => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum DetectError {
    #[error("face model unavailable: {0}")]
    Model(String),
    #[error("face detection failed: {0}")]
    Backend(String),
}

/// Pluggable face detection backend.
///
/// Implementations are loaded once and shared across requests, so `detect`
/// takes `&self` and must be safe to call concurrently.
pub trait FaceDetector: Send + Sync {
    /// Short backend name for logs and the health endpoint.
    fn name(&self) -> &'static str;

    /// Detect faces in a grayscale image, in the backend's natural order.
    fn detect(&self, image: &GrayImage) -> Result<Vec<FaceRect>, DetectError>;
}

/// Backend that never finds a face. Covers fall back to right alignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaceDetector;

impl FaceDetector for NoFaceDetector {
    fn name(&self) -> &'static str {
        "none"
    }

    fn detect(&self, _image: &GrayImage) -> Result<Vec<FaceRect>, DetectError> {
        Ok(Vec::new())
    }
}

/// Run `detector` and keep the largest face.
///
/// Ties on area go to the face the backend reported first.
pub fn detect_largest_face(detector: &dyn FaceDetector, image: &DynamicImage) -> FaceBox {
    let gray = image.to_luma8();
    match detector.detect(&gray) {
        Ok(faces) => largest(&faces),
        Err(e) => {
            tracing::warn!(backend = detector.name(), error = %e, "Fail to recognize face");
            FaceBox::None
        }
    }
}

fn largest(faces: &[FaceRect]) -> FaceBox {
    faces
        .iter()
        .fold(None::<&FaceRect>, |best, face| match best {
            Some(b) if b.area() >= face.area() => Some(b),
            _ => Some(face),
        })
        .map_or(FaceBox::None, |f| FaceBox::Found(*f))
}

/// Build the configured backend.
///
/// Falls back to [`NoFaceDetector`] when detection is disabled, no model is
/// configured, or the model cannot be loaded.
pub fn build_detector(config: &FaceDetectionConfig) -> Arc<dyn FaceDetector> {
    if !config.enabled {
        tracing::info!("Face detection disabled");
        return Arc::new(NoFaceDetector);
    }

    let Some(model_path) = config.model_path.as_deref() else {
        tracing::info!("No face model configured; covers will be right-aligned");
        return Arc::new(NoFaceDetector);
    };

    load_backend(model_path, config.min_face_size)
}

#[cfg(feature = "seeta")]
fn load_backend(model_path: &std::path::Path, min_face_size: u32) -> Arc<dyn FaceDetector> {
    match super::seeta::SeetaDetector::load(model_path, min_face_size) {
        Ok(detector) => {
            tracing::info!(model = %model_path.display(), "Face model loaded");
            Arc::new(detector)
        }
        Err(e) => {
            tracing::error!(model = %model_path.display(), error = %e, "Failed to load face model");
            Arc::new(NoFaceDetector)
        }
    }
}

#[cfg(not(feature = "seeta"))]
fn load_backend(model_path: &std::path::Path, _min_face_size: u32) -> Arc<dyn FaceDetector> {
    tracing::warn!(
        model = %model_path.display(),
        "Face model configured but built without the `seeta` feature"
    );
    Arc::new(NoFaceDetector)
}
