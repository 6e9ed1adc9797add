//! Reusable test helpers for pipeline and service integration tests.
//!
//! Provides in-memory [`BlobStore`] and [`MetadataStore`] fakes so tests run
//! without a database or object store, plus image fixture builders.
#![allow(dead_code)]

use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use image::{DynamicImage, ImageFormat, ImageReader};
use uuid::Uuid;

use darkroom::db::{ImageMetadataRecord, MetadataError, MetadataStore, NewImageMetadata};
use darkroom::service::MediaService;
use darkroom::storage::{BlobStore, StorageError};
use darkroom::PolicyTable;

// ============================================================================
// Image fixtures
// ============================================================================

/// Flat RGB JPEG of the given dimensions.
pub fn jpeg_fixture(width: u32, height: u32) -> Bytes {
    let img = DynamicImage::new_rgb8(width, height);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Jpeg)
        .expect("failed to encode JPEG fixture");
    Bytes::from(buf.into_inner())
}

/// Flat RGB PNG of the given dimensions.
pub fn png_fixture(width: u32, height: u32) -> Bytes {
    let img = DynamicImage::new_rgb8(width, height);
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .expect("failed to encode PNG fixture");
    Bytes::from(buf.into_inner())
}

/// Decode artifact bytes, returning the image and its sniffed format.
pub fn decode_artifact(data: &[u8]) -> (DynamicImage, ImageFormat) {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .expect("failed to sniff artifact format");
    let format = reader.format().expect("artifact has no detectable format");
    let img = reader.decode().expect("failed to decode artifact");
    (img, format)
}

// ============================================================================
// In-memory blob store
// ============================================================================

/// [`BlobStore`] fake backed by a map, mirroring the filesystem backend's
/// semantics (delete of a missing object reports `NotFound`).
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: DashMap<String, (Bytes, String)>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn bytes_at(&self, path: &str) -> Option<Bytes> {
        self.objects.get(path).map(|entry| entry.0.clone())
    }

    pub fn content_type_at(&self, path: &str) -> Option<String> {
        self.objects.get(path).map(|entry| entry.1.clone())
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        self.objects
            .insert(path.to_string(), (data, content_type.to_string()));
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.objects.contains_key(path))
    }

    async fn url(&self, path: &str) -> Result<String, StorageError> {
        Ok(format!("memory://{path}"))
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.objects
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

/// Blob store that rejects writes to paths containing a marker substring,
/// delegating everything else to an inner [`MemoryBlobStore`].
pub struct FailingBlobStore {
    pub inner: MemoryBlobStore,
    fail_substring: String,
}

impl FailingBlobStore {
    pub fn failing_on(substring: &str) -> Self {
        Self {
            inner: MemoryBlobStore::new(),
            fail_substring: substring.to_string(),
        }
    }
}

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn put(&self, path: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        if path.contains(&self.fail_substring) {
            return Err(StorageError::Write(format!("injected failure for {path}")));
        }
        self.inner.put(path, data, content_type).await
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        self.inner.exists(path).await
    }

    async fn url(&self, path: &str) -> Result<String, StorageError> {
        self.inner.url(path).await
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.inner.delete(path).await
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

// ============================================================================
// In-memory metadata store
// ============================================================================

/// [`MetadataStore`] fake keyed by `image_path`, enforcing the unique-path
/// invariant the real table enforces with a constraint.
#[derive(Default)]
pub struct MemoryMetadataStore {
    records: DashMap<String, ImageMetadataRecord>,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn insert(&self, new: NewImageMetadata) -> Result<ImageMetadataRecord, MetadataError> {
        if self.records.contains_key(&new.image_path) {
            return Err(MetadataError::Duplicate(new.image_path));
        }
        let now = Utc::now();
        let record = ImageMetadataRecord {
            id: Uuid::new_v4(),
            image_path: new.image_path,
            thumbnail_path: new.thumbnail_path,
            high_res_path: new.high_res_path,
            original_path: new.original_path,
            category: new.category,
            entity_type: new.entity_type,
            entity_id: new.entity_id,
            width: new.width,
            height: new.height,
            file_size: new.file_size,
            original_file_size: new.original_file_size,
            format: new.format,
            content_type: new.content_type,
            uploaded_by: new.uploaded_by,
            created_at: now,
            updated_at: now,
        };
        self.records
            .insert(record.image_path.clone(), record.clone());
        Ok(record)
    }

    async fn find_by_image_path(
        &self,
        image_path: &str,
    ) -> Result<Option<ImageMetadataRecord>, MetadataError> {
        Ok(self.records.get(image_path).map(|entry| entry.clone()))
    }

    async fn delete_by_image_path(
        &self,
        image_path: &str,
    ) -> Result<Option<ImageMetadataRecord>, MetadataError> {
        Ok(self.records.remove(image_path).map(|(_, record)| record))
    }

    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<Vec<ImageMetadataRecord>, MetadataError> {
        let mut records: Vec<_> = self
            .records
            .iter()
            .filter(|record| {
                record.entity_type == entity_type && record.entity_id == Some(entity_id)
            })
            .map(|record| record.clone())
            .collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn health_check(&self) -> Result<(), MetadataError> {
        Ok(())
    }
}

/// Metadata store whose inserts always fail, for rollback tests.
pub struct RejectingMetadataStore;

#[async_trait]
impl MetadataStore for RejectingMetadataStore {
    async fn insert(&self, _new: NewImageMetadata) -> Result<ImageMetadataRecord, MetadataError> {
        Err(MetadataError::Database(sqlx::Error::PoolTimedOut))
    }

    async fn find_by_image_path(
        &self,
        _image_path: &str,
    ) -> Result<Option<ImageMetadataRecord>, MetadataError> {
        Ok(None)
    }

    async fn delete_by_image_path(
        &self,
        _image_path: &str,
    ) -> Result<Option<ImageMetadataRecord>, MetadataError> {
        Ok(None)
    }

    async fn list_for_entity(
        &self,
        _entity_type: &str,
        _entity_id: i64,
    ) -> Result<Vec<ImageMetadataRecord>, MetadataError> {
        Ok(Vec::new())
    }

    async fn health_check(&self) -> Result<(), MetadataError> {
        Err(MetadataError::Database(sqlx::Error::PoolTimedOut))
    }
}

// ============================================================================
// Service construction
// ============================================================================

/// Service over fresh in-memory stores, returning handles for assertions.
pub fn memory_service() -> (MediaService, Arc<MemoryBlobStore>, Arc<MemoryMetadataStore>) {
    let blobs = Arc::new(MemoryBlobStore::new());
    let metadata = Arc::new(MemoryMetadataStore::new());
    let service = MediaService::new(PolicyTable::builtin(), blobs.clone(), metadata.clone());
    (service, blobs, metadata)
}
