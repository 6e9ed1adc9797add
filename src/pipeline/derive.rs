//! Derivative generation.
//!
//! Turns one validated upload into a complete [`ArtifactBundle`]: the primary
//! artifact, a mandatory thumbnail, an optional high-res variant, and
//! (optionally) the retained source bytes, each with its storage path already
//! assigned. Failure at any step aborts the whole bundle.

use bytes::Bytes;
use image::GenericImageView;

use crate::naming;
use crate::pipeline::{encode, transform, PipelineError};
use crate::policy::{ImageCategory, OutputFormat, PolicyTable};

/// One encoded artifact, ready to be written to the blob store.
#[derive(Debug, Clone)]
pub struct ImageArtifact {
    /// Storage path assigned by the path namer.
    pub path: String,
    pub data: Bytes,
    pub width: u32,
    pub height: u32,
    pub content_type: String,
}

/// Descriptive fields for the metadata record, drafted during generation.
#[derive(Debug, Clone)]
pub struct MetadataDraft {
    pub original_filename: String,
    pub original_size: usize,
    /// Post-transform dimensions of the primary artifact.
    pub width: u32,
    pub height: u32,
    pub format: OutputFormat,
    pub content_type: String,
}

/// Caller-supplied context for a bundle.
#[derive(Debug, Clone, Default)]
pub struct BundleOptions {
    /// Owning entity type. Conventional values are "customers",
    /// "professionals", "venues", and "staff", but any non-empty string is
    /// accepted. Empty or absent falls back to
    /// [`naming::FALLBACK_ENTITY_TYPE`].
    pub entity_type: Option<String>,
    /// Owning entity id; absent uses the placeholder path segment.
    pub entity_id: Option<i64>,
    /// Retain the untouched upload bytes alongside the derivatives.
    pub keep_original: bool,
}

/// Everything produced for one upload.
///
/// Transient: bundles exist between processing and persistence and are not
/// stored as-is.
#[derive(Debug, Clone)]
pub struct ArtifactBundle {
    pub category: ImageCategory,
    /// Resolved entity type, fallback already applied.
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub primary: ImageArtifact,
    pub thumbnail: ImageArtifact,
    pub high_res: Option<ImageArtifact>,
    pub original: Option<ImageArtifact>,
    pub metadata: MetadataDraft,
}

impl ArtifactBundle {
    /// All artifacts present in this bundle, primary first.
    pub fn artifacts(&self) -> impl Iterator<Item = &ImageArtifact> {
        [
            Some(&self.primary),
            Some(&self.thumbnail),
            self.high_res.as_ref(),
            self.original.as_ref(),
        ]
        .into_iter()
        .flatten()
    }

    /// Storage paths of all artifacts present in this bundle.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.artifacts().map(|artifact| artifact.path.clone()).collect()
    }
}

/// Generate the full artifact bundle for one upload.
///
/// Decodes the source, strips metadata, applies the category's geometry, and
/// encodes the primary artifact. The thumbnail is then rendered from a copy
/// of the finished primary under the thumbnail category's spec. When the
/// category defines a high-res target, that variant comes from a second
/// decode of the source, never from the downscaled primary.
///
/// This function is CPU-bound and should be called inside `spawn_blocking`.
pub fn generate_bundle(
    source: &[u8],
    original_filename: &str,
    category: ImageCategory,
    policies: &PolicyTable,
    options: &BundleOptions,
) -> Result<ArtifactBundle, PipelineError> {
    let spec = policies.spec_for(category);
    let thumb_spec = policies.spec_for(ImageCategory::Thumbnail);

    let decoded = transform::decode_bounded(source)?;
    let stripped = transform::strip_metadata(&decoded);
    let primary_img = transform::apply_spec_geometry(&stripped, spec);
    let (width, height) = primary_img.dimensions();
    let primary_bytes = encode::encode(&primary_img, spec.format, spec.quality)?;

    let thumb_img = transform::apply_spec_geometry(&primary_img, thumb_spec);
    let (thumb_width, thumb_height) = thumb_img.dimensions();
    let thumb_bytes = encode::encode(&thumb_img, thumb_spec.format, thumb_spec.quality)?;

    let high_res_encoded = match spec.high_res_target {
        Some((hr_width, hr_height)) => {
            let fresh = transform::strip_metadata(&transform::decode_bounded(source)?);
            let hr_img = transform::resize_exact(&fresh, hr_width, hr_height);
            let hr_bytes = encode::encode(&hr_img, spec.format, spec.quality)?;
            Some((hr_bytes, hr_width, hr_height))
        }
        None => None,
    };

    let entity_type = options
        .entity_type
        .as_deref()
        .filter(|t| !t.is_empty())
        .unwrap_or(naming::FALLBACK_ENTITY_TYPE)
        .to_string();
    let filename = naming::unique_filename(original_filename);
    let primary_path = naming::image_path(&entity_type, options.entity_id, category, &filename);

    let thumbnail = ImageArtifact {
        path: naming::sibling_path(&primary_path, &naming::thumbnail_filename(&filename)),
        data: Bytes::from(thumb_bytes),
        width: thumb_width,
        height: thumb_height,
        content_type: thumb_spec.format.content_type().to_string(),
    };

    let high_res = high_res_encoded.map(|(data, hr_width, hr_height)| ImageArtifact {
        path: naming::sibling_path(&primary_path, &naming::high_res_filename(&filename)),
        data: Bytes::from(data),
        width: hr_width,
        height: hr_height,
        content_type: spec.format.content_type().to_string(),
    });

    let original = if options.keep_original {
        let (source_width, source_height) = decoded.dimensions();
        Some(ImageArtifact {
            path: naming::original_path(&primary_path),
            data: Bytes::copy_from_slice(source),
            width: source_width,
            height: source_height,
            content_type: mime_guess::from_path(original_filename)
                .first()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "application/octet-stream".to_string()),
        })
    } else {
        None
    };

    let metadata = MetadataDraft {
        original_filename: original_filename.to_string(),
        original_size: source.len(),
        width,
        height,
        format: spec.format,
        content_type: spec.format.content_type().to_string(),
    };

    Ok(ArtifactBundle {
        category,
        entity_type,
        entity_id: options.entity_id,
        primary: ImageArtifact {
            path: primary_path,
            data: Bytes::from(primary_bytes),
            width,
            height,
            content_type: spec.format.content_type().to_string(),
        },
        thumbnail,
        high_res,
        original,
        metadata,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    use image::{DynamicImage, ImageFormat};

    fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, height);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Jpeg)
            .expect("failed to encode test JPEG");
        buf.into_inner()
    }

    #[test]
    fn test_bundle_paths_share_one_directory_and_base_name() {
        let source = jpeg_bytes(1600, 900);
        let bundle = generate_bundle(
            &source,
            "shopfront.jpg",
            ImageCategory::Venue,
            &PolicyTable::builtin(),
            &BundleOptions {
                entity_type: Some("venues".to_string()),
                entity_id: Some(12),
                keep_original: true,
            },
        )
        .expect("bundle generation failed");

        let primary = &bundle.primary.path;
        assert!(primary.starts_with("venues/12/images/venue/"), "got {primary}");

        let base = primary.rsplit('/').next().unwrap();
        assert_eq!(
            bundle.thumbnail.path,
            format!("venues/12/images/venue/thumb_{base}")
        );
        let original = bundle.original.as_ref().expect("original missing");
        assert_eq!(
            original.path,
            format!("venues/12/images/venue/originals/original_{base}")
        );
    }

    #[test]
    fn test_fallback_segments_apply_when_entity_is_unknown() {
        let source = jpeg_bytes(400, 400);
        let bundle = generate_bundle(
            &source,
            "me.jpg",
            ImageCategory::Profile,
            &PolicyTable::builtin(),
            &BundleOptions::default(),
        )
        .expect("bundle generation failed");

        assert_eq!(bundle.entity_type, "misc");
        assert!(bundle.primary.path.starts_with("misc/temp/images/profile/"));
    }

    #[test]
    fn test_thumbnail_is_always_present_with_fixed_dimensions() {
        let source = jpeg_bytes(900, 900);
        for category in [ImageCategory::Profile, ImageCategory::Venue] {
            let bundle = generate_bundle(
                &source,
                "any.jpg",
                category,
                &PolicyTable::builtin(),
                &BundleOptions::default(),
            )
            .expect("bundle generation failed");

            assert_eq!(
                (bundle.thumbnail.width, bundle.thumbnail.height),
                (300, 200),
                "category {category}"
            );
            assert_eq!(bundle.thumbnail.content_type, "image/jpeg");
        }
    }

    #[test]
    fn test_high_res_is_exclusive_to_categories_that_define_it() {
        let source = jpeg_bytes(600, 600);

        let logo = generate_bundle(
            &source,
            "mark.jpg",
            ImageCategory::Logo,
            &PolicyTable::builtin(),
            &BundleOptions::default(),
        )
        .expect("bundle generation failed");
        let high_res = logo.high_res.expect("logo bundle missing high-res");
        assert_eq!((high_res.width, high_res.height), (1000, 1000));

        let profile = generate_bundle(
            &source,
            "me.jpg",
            ImageCategory::Profile,
            &PolicyTable::builtin(),
            &BundleOptions::default(),
        )
        .expect("bundle generation failed");
        assert!(profile.high_res.is_none());
    }

    #[test]
    fn test_metadata_draft_reflects_primary_artifact() {
        let source = jpeg_bytes(4000, 2000);
        let bundle = generate_bundle(
            &source,
            "wide.jpg",
            ImageCategory::Venue,
            &PolicyTable::builtin(),
            &BundleOptions::default(),
        )
        .expect("bundle generation failed");

        assert_eq!((bundle.metadata.width, bundle.metadata.height), (1200, 800));
        assert_eq!(bundle.metadata.original_size, source.len());
        assert_eq!(bundle.metadata.original_filename, "wide.jpg");
        assert_eq!(bundle.metadata.content_type, "image/jpeg");
        assert!(!bundle.primary.data.is_empty());
    }

    #[test]
    fn test_artifacts_iterator_covers_every_present_artifact() {
        let source = jpeg_bytes(500, 500);
        let bundle = generate_bundle(
            &source,
            "mark.png",
            ImageCategory::Logo,
            &PolicyTable::builtin(),
            &BundleOptions {
                entity_type: Some("professionals".to_string()),
                entity_id: Some(3),
                keep_original: true,
            },
        )
        .expect("bundle generation failed");

        // Logo with retained original: primary, thumbnail, high-res, original.
        assert_eq!(bundle.artifacts().count(), 4);
        assert_eq!(bundle.paths().len(), 4);
    }

    #[test]
    fn test_unreadable_source_aborts_the_bundle() {
        let err = generate_bundle(
            b"not image data",
            "broken.jpg",
            ImageCategory::Profile,
            &PolicyTable::builtin(),
            &BundleOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::UnreadableImage(_)), "got {err:?}");
    }
}
