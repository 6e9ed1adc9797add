//! Decoding and geometric transformation.
//!
//! The transformer owns every pixel-level step before encoding: bounded
//! decode, metadata stripping, aspect-ratio cropping, and exact resizing.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader, Limits};

use crate::pipeline::PipelineError;
use crate::policy::ImageSpec;

/// Maximum image dimension (width or height) to prevent decompression bombs.
/// A 16384x16384 RGBA image is ~1 GB in memory, acceptable for processing.
pub const MAX_IMAGE_DIMENSION: u32 = 16384;

/// Uploads whose width/height ratio is within this distance of the target
/// ratio are resized without cropping.
pub const RATIO_TOLERANCE: f64 = 0.1;

/// Decode an upload with dimension limits enforced.
///
/// The container format is sniffed from the bytes, not taken from the
/// filename, so a mislabeled upload decodes by its real format or fails here.
pub fn decode_bounded(data: &[u8]) -> Result<DynamicImage, PipelineError> {
    let mut reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| PipelineError::UnreadableImage(e.to_string()))?;

    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_IMAGE_DIMENSION);
    limits.max_image_height = Some(MAX_IMAGE_DIMENSION);
    reader.limits(limits);

    reader
        .decode()
        .map_err(|e| PipelineError::UnreadableImage(e.to_string()))
}

/// Rebuild the image from its raw pixel data.
///
/// The returned image is a fresh pixel buffer carrying nothing but pixels, so
/// EXIF blocks, GPS tags, and color profiles from the source never reach any
/// encoded artifact. Alpha is preserved only when the source has it.
#[must_use]
pub fn strip_metadata(img: &DynamicImage) -> DynamicImage {
    if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    }
}

/// Center-crop the image to `target_ratio` (width / height).
///
/// Images already within [`RATIO_TOLERANCE`] of the target are returned
/// unchanged. The crop trims the long axis symmetrically; fractional pixel
/// positions truncate toward zero.
#[must_use]
pub fn crop_to_ratio(img: &DynamicImage, target_ratio: f64) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return img.clone();
    }

    let current_ratio = f64::from(width) / f64::from(height);
    if (current_ratio - target_ratio).abs() <= RATIO_TOLERANCE {
        return img.clone();
    }

    if current_ratio > target_ratio {
        // Too wide: keep full height, trim both sides.
        let new_width = (f64::from(height) * target_ratio) as u32;
        let left = (width - new_width) / 2;
        img.crop_imm(left, 0, new_width, height)
    } else {
        // Too tall: keep full width, trim top and bottom.
        let new_height = (f64::from(width) / target_ratio) as u32;
        let top = (height - new_height) / 2;
        img.crop_imm(0, top, width, new_height)
    }
}

/// Resize to exactly `width` x `height` with Lanczos resampling.
#[must_use]
pub fn resize_exact(img: &DynamicImage, width: u32, height: u32) -> DynamicImage {
    img.resize_exact(width, height, FilterType::Lanczos3)
}

/// Apply a spec's full geometry: ratio crop (when configured) then exact
/// resize to the target dimensions.
#[must_use]
pub fn apply_spec_geometry(img: &DynamicImage, spec: &ImageSpec) -> DynamicImage {
    let cropped = match spec.target_aspect_ratio {
        Some(ratio) => crop_to_ratio(img, ratio),
        None => img.clone(),
    };
    resize_exact(&cropped, spec.target_width, spec.target_height)
}
