//! Darkroom
//!
//! Image ingestion and derivative-generation pipeline: validates uploads
//! against per-category policies, strips metadata, crops and resizes,
//! re-encodes, derives thumbnail and high-res variants, and persists blobs
//! plus a metadata record through pluggable storage backends.

pub mod config;
pub mod db;
pub mod naming;
pub mod pipeline;
pub mod policy;
pub mod service;
pub mod storage;

pub use pipeline::{ArtifactBundle, BundleOptions, PipelineError};
pub use policy::{ImageCategory, ImageSpec, OutputFormat, PolicyTable, UnknownCategory};
pub use service::{DeleteOutcome, MediaError, MediaService};
