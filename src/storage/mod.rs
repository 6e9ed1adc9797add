//! Blob storage port and backends.
//!
//! The pipeline and service only ever talk to [`BlobStore`]; the filesystem
//! and S3 backends implement it, and tests substitute an in-memory fake.
//! Paths are the flat `/`-separated keys produced by [`crate::naming`].

mod filesystem;
mod s3;

pub use filesystem::FilesystemStore;
pub use s3::S3Store;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

/// Blob storage operation errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid storage path: {0}")]
    InvalidPath(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("URL resolution failed: {0}")]
    Url(String),

    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Key-value object store holding encoded artifacts.
///
/// `delete` of a missing object reports [`StorageError::NotFound`] where the
/// backend can tell (S3 deletes are silently idempotent); callers that only
/// need best-effort removal treat that variant as success.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `data` at `path`, replacing any existing object.
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Whether an object exists at `path`.
    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    /// Servable URL for the object at `path`. Does not verify existence.
    async fn url(&self, path: &str) -> Result<String, StorageError>;

    /// Remove the object at `path`.
    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Static identifier for logging, e.g. "filesystem" or "s3".
    fn backend_name(&self) -> &'static str;

    /// Verify the backend is reachable. The default suits backends with no
    /// connection to check.
    async fn health_check(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
