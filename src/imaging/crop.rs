//! Cover cropping and JPEG re-encoding.
//!
//! Covers are cut to a 2:3 portrait strip of the full source height. Which
//! strip is chosen depends on where the largest face sits:
//!
//! ```text
//! no face                      → right-aligned
//! face right edge ≥ width/2    → right-aligned
//! face left edge  ≤ width/2    → left-aligned
//! otherwise                    → centred on the face midpoint
//! ```
//!
//! The offset is always clamped so the strip stays inside the image.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ExtendedColorType};
use thiserror::Error;

use crate::imaging::face::{detect_largest_face, FaceBox, FaceDetector};
use crate::imaging::role::ImageRole;

/// JPEG quality for every served image.
pub const JPEG_QUALITY: u8 = 90;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),
}

/// Horizontal strip to keep from a cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub width: u32,
    pub height: u32,
}

/// Width of a 2:3 cover for the given height.
pub fn cover_width(height: u32) -> u32 {
    (u64::from(height) * 2 / 3) as u32
}

/// Whether an image of this size and role will be cropped.
pub fn needs_crop(width: u32, height: u32, role: ImageRole) -> bool {
    role.is_cropped() && width > cover_width(height)
}

/// Left edge of the cover strip.
pub fn crop_offset(width: u32, target_width: u32, face: FaceBox) -> u32 {
    let width = i64::from(width);
    let target = i64::from(target_width);
    let right_aligned = width - target;
    let half = width / 2;

    let x = match face {
        FaceBox::None => right_aligned,
        FaceBox::Found(f) if f.right >= half => right_aligned,
        FaceBox::Found(f) if f.left <= half => 0,
        FaceBox::Found(f) => (f.left + f.right) / 2 - target / 2,
    };

    x.clamp(0, right_aligned.max(0)) as u32
}

/// Geometry of the crop for an image, or `None` if it is served uncropped.
pub fn plan_crop(width: u32, height: u32, role: ImageRole, face: FaceBox) -> Option<CropRect> {
    if !needs_crop(width, height, role) {
        return None;
    }
    let target = cover_width(height);
    Some(CropRect {
        x: crop_offset(width, target, face),
        width: target,
        height,
    })
}

/// Output of [`transform`].
#[derive(Debug, Clone)]
pub struct Transformed {
    pub jpeg: Vec<u8>,
    pub crop: Option<CropRect>,
}

/// Decode `bytes`, crop covers, and re-encode as JPEG.
///
/// The detector runs only when a crop is actually needed.
pub fn transform(
    bytes: &[u8],
    role: ImageRole,
    detector: &dyn FaceDetector,
) -> Result<Transformed, ImageError> {
    let image = image::load_from_memory(bytes).map_err(ImageError::Decode)?;
    let (width, height) = (image.width(), image.height());

    let crop = if needs_crop(width, height, role) {
        let face = detect_largest_face(detector, &image);
        plan_crop(width, height, role, face)
    } else {
        None
    };

    let output = match crop {
        Some(rect) => {
            tracing::info!(width, height, x = rect.x, "Cropping cover");
            image.crop_imm(rect.x, 0, rect.width, rect.height)
        }
        None => {
            tracing::debug!(width, height, role = %role, "No crop needed");
            image
        }
    };

    Ok(Transformed {
        jpeg: encode_jpeg(&output)?,
        crop,
    })
}

/// Encode as baseline RGB JPEG; alpha is dropped.
pub fn encode_jpeg(image: &DynamicImage) -> Result<Vec<u8>, ImageError> {
    let rgb = image.to_rgb8();
    let mut out = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(ImageError::Encode)?;
    Ok(out.into_inner())
}
