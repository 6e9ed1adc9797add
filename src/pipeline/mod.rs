//! The image processing pipeline.
//!
//! Stages run in a fixed order: [`validate`](validate::validate) rejects bad
//! uploads before any decoding, [`transform`] decodes and reshapes pixels,
//! [`encode`] serializes them, and [`derive`] orchestrates the stages into a
//! complete [`ArtifactBundle`] of primary, thumbnail, and optional high-res
//! artifacts. Every stage is a pure function; persistence happens elsewhere.

pub mod derive;
pub mod encode;
pub mod transform;
pub mod validate;

pub use derive::{generate_bundle, ArtifactBundle, BundleOptions, ImageArtifact, MetadataDraft};
pub use validate::validate;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Unsupported file extension {extension:?}, allowed extensions are: {allowed}")]
    UnsupportedExtension { extension: String, allowed: String },
    #[error("File size {size} exceeds maximum allowed size of {max} bytes")]
    FileTooLarge { size: usize, max: usize },
    #[error("Image decode failed: {0}")]
    UnreadableImage(String),
    #[error("Image encoding failed: {0}")]
    EncodingError(String),
}
