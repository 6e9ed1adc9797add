//! Artifact encoding.

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ExtendedColorType, ImageEncoder};

use crate::pipeline::PipelineError;
use crate::policy::OutputFormat;

/// Serialize a transformed image into `format` at `quality`.
///
/// JPEG output drops any alpha channel by converting to RGB first. PNG output
/// keeps alpha when the image carries it and uses the slowest, smallest
/// compression level; PNG being lossless, `quality` does not apply.
pub fn encode(
    img: &DynamicImage,
    format: OutputFormat,
    quality: u8,
) -> Result<Vec<u8>, PipelineError> {
    let mut buf = Cursor::new(Vec::new());

    match format {
        OutputFormat::Jpeg => {
            let rgb = img.to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
            encoder
                .encode_image(&rgb)
                .map_err(|e| PipelineError::EncodingError(e.to_string()))?;
        }
        OutputFormat::Png => {
            let encoder =
                PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive);
            if img.color().has_alpha() {
                let rgba = img.to_rgba8();
                encoder
                    .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
                    .map_err(|e| PipelineError::EncodingError(e.to_string()))?;
            } else {
                let rgb = img.to_rgb8();
                encoder
                    .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                    .map_err(|e| PipelineError::EncodingError(e.to_string()))?;
            }
        }
    }

    Ok(buf.into_inner())
}
