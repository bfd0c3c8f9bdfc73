//! SeetaFace cascade backend (`seeta` feature).

use std::path::Path;
use std::sync::Mutex;

use image::GrayImage;
use rustface::{Detector, ImageData};

use super::face::{DetectError, FaceDetector, FaceRect};

/// Frontal face cascade loaded once from a model file.
///
/// The underlying detector needs `&mut self`, so calls are serialised.
pub struct SeetaDetector {
    inner: Mutex<Box<dyn Detector>>,
}

impl SeetaDetector {
    pub fn load(model_path: &Path, min_face_size: u32) -> Result<Self, DetectError> {
        let path = model_path
            .to_str()
            .ok_or_else(|| DetectError::Model(format!("non UTF-8 path {}", model_path.display())))?;
        let mut detector =
            rustface::create_detector(path).map_err(|e| DetectError::Model(format!("{e:?}")))?;
        detector.set_min_face_size(min_face_size);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        Ok(Self {
            inner: Mutex::new(detector),
        })
    }
}

impl FaceDetector for SeetaDetector {
    fn name(&self) -> &'static str {
        "seeta"
    }

    fn detect(&self, image: &GrayImage) -> Result<Vec<FaceRect>, DetectError> {
        let data = ImageData::new(image.as_raw(), image.width(), image.height());
        let mut detector = self
            .inner
            .lock()
            .map_err(|_| DetectError::Backend("detector mutex poisoned".into()))?;

        Ok(detector
            .detect(&data)
            .iter()
            .map(|face| {
                let bbox = face.bbox();
                FaceRect::from_xywh(
                    bbox.x() as i64,
                    bbox.y() as i64,
                    bbox.width() as i64,
                    bbox.height() as i64,
                )
            })
            .collect())
    }
}

impl Drop for SeetaDetector {
    fn drop(&mut self) {
        tracing::info!("Face model released");
    }
}
