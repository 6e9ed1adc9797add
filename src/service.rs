//! Persistence and lookup for processed images.
//!
//! [`MediaService`] ties the pipeline to the two external ports: the
//! [`BlobStore`] holding artifact bytes and the [`MetadataStore`] holding
//! their records. The write discipline is fixed: blobs first, metadata only
//! after every blob write succeeded; deletes remove blobs and the record as
//! one logical unit.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::future;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::{MediaConfig, StorageBackendKind};
use crate::db::{
    self, ImageMetadataRecord, MetadataError, MetadataStore, NewImageMetadata, PgMetadataStore,
};
use crate::pipeline::{
    generate_bundle, validate, ArtifactBundle, BundleOptions, PipelineError,
};
use crate::policy::{ImageCategory, PolicyTable};
use crate::storage::{BlobStore, FilesystemStore, S3Store, StorageError};

/// Default bound on decode/encode work per upload.
const DEFAULT_PROCESSING_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors surfaced by [`MediaService`] operations.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Validation or pipeline processing rejected the upload.
    #[error("processing failed: {0}")]
    Pipeline(#[from] PipelineError),

    /// A blob store operation failed.
    #[error("storage failure: {0}")]
    Storage(#[from] StorageError),

    /// A metadata store operation failed.
    #[error("metadata failure: {0}")]
    Metadata(#[from] MetadataError),

    /// Processing exceeded the configured time budget.
    #[error("image processing timed out after {0:?}")]
    ProcessingTimeout(Duration),

    /// The processing task died without producing a result.
    #[error("image processing task failed: {0}")]
    Internal(String),

    /// Neither a record nor a blob exists for the given path.
    #[error("no image found at {0}")]
    NotFound(String),
}

/// What a [`MediaService::delete`] call removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// A metadata record and every blob it referenced.
    RecordAndBlobs,
    /// A bare blob with no metadata record.
    BlobOnly,
}

/// The media pipeline's persistence service.
///
/// Cheap to share: hold it in an `Arc` or clone the inner `Arc`s per task.
pub struct MediaService {
    policies: PolicyTable,
    blobs: Arc<dyn BlobStore>,
    metadata: Arc<dyn MetadataStore>,
    processing_timeout: Duration,
}

impl MediaService {
    #[must_use]
    pub fn new(
        policies: PolicyTable,
        blobs: Arc<dyn BlobStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        Self {
            policies,
            blobs,
            metadata,
            processing_timeout: DEFAULT_PROCESSING_TIMEOUT,
        }
    }

    /// Replace the processing time budget.
    #[must_use]
    pub fn with_processing_timeout(mut self, timeout: Duration) -> Self {
        self.processing_timeout = timeout;
        self
    }

    /// Wire up a service from configuration: `PostgreSQL` metadata store plus
    /// the configured blob backend, with migrations applied and both ports
    /// health-checked.
    pub async fn from_config(config: &MediaConfig) -> anyhow::Result<Self> {
        let pool = db::create_pool(&config.database_url).await?;
        db::run_migrations(&pool).await?;
        let metadata: Arc<dyn MetadataStore> = Arc::new(PgMetadataStore::new(pool));

        let blobs: Arc<dyn BlobStore> = match config.storage_backend {
            StorageBackendKind::Filesystem => Arc::new(
                FilesystemStore::new(&config.media_root, config.media_base_url.clone()).await?,
            ),
            StorageBackendKind::S3 => Arc::new(S3Store::new(config).await?),
        };
        blobs.health_check().await?;

        info!(backend = blobs.backend_name(), "Media service initialized");
        Ok(Self::new(PolicyTable::builtin(), blobs, metadata)
            .with_processing_timeout(Duration::from_secs(config.processing_timeout_secs)))
    }

    #[must_use]
    pub fn policies(&self) -> &PolicyTable {
        &self.policies
    }

    /// Validate and process one upload into an [`ArtifactBundle`].
    ///
    /// Validation runs inline; the CPU-bound pipeline runs on a blocking
    /// thread under the processing timeout. The blocking task cannot be
    /// aborted, an elapsed timeout only unblocks the caller.
    pub async fn process(
        &self,
        data: Bytes,
        filename: &str,
        category: ImageCategory,
        options: BundleOptions,
    ) -> Result<ArtifactBundle, MediaError> {
        let spec = self.policies.spec_for(category);
        validate(filename, data.len(), spec)?;

        let policies = self.policies.clone();
        let filename = filename.to_string();
        let task = tokio::task::spawn_blocking(move || {
            generate_bundle(&data, &filename, category, &policies, &options)
        });

        match tokio::time::timeout(self.processing_timeout, task).await {
            Ok(Ok(bundle)) => Ok(bundle?),
            Ok(Err(join_err)) => Err(MediaError::Internal(join_err.to_string())),
            Err(_) => Err(MediaError::ProcessingTimeout(self.processing_timeout)),
        }
    }

    /// Persist a bundle: all blob writes fan out concurrently, and the
    /// metadata record is committed only after every write succeeded.
    ///
    /// On any failure the record is not created and blobs already written in
    /// this attempt are removed best-effort before the error is returned.
    pub async fn save(
        &self,
        bundle: ArtifactBundle,
        uploaded_by: Option<Uuid>,
    ) -> Result<(String, ImageMetadataRecord), MediaError> {
        let draft = NewImageMetadata {
            image_path: bundle.primary.path.clone(),
            thumbnail_path: Some(bundle.thumbnail.path.clone()),
            high_res_path: bundle.high_res.as_ref().map(|a| a.path.clone()),
            original_path: bundle.original.as_ref().map(|a| a.path.clone()),
            category: bundle.category,
            entity_type: bundle.entity_type.clone(),
            entity_id: bundle.entity_id,
            width: bundle.metadata.width as i32,
            height: bundle.metadata.height as i32,
            file_size: bundle.primary.data.len() as i64,
            original_file_size: Some(bundle.metadata.original_size as i64),
            format: bundle.metadata.format.as_str().to_string(),
            content_type: bundle.metadata.content_type.clone(),
            uploaded_by,
        };
        let paths = bundle.paths();

        let writes = bundle
            .artifacts()
            .map(|artifact| {
                self.blobs
                    .put(&artifact.path, artifact.data.clone(), &artifact.content_type)
            })
            .collect::<Vec<_>>();

        if let Err(e) = future::try_join_all(writes).await {
            error!(
                image_path = %draft.image_path,
                error = %e,
                "Blob write failed, removing artifacts from this attempt"
            );
            self.remove_blobs_best_effort(&paths).await;
            return Err(MediaError::Storage(e));
        }

        let image_path = draft.image_path.clone();
        match self.metadata.insert(draft).await {
            Ok(record) => {
                info!(
                    image_path = %record.image_path,
                    category = %record.category,
                    entity_type = %record.entity_type,
                    blob_count = paths.len(),
                    backend = self.blobs.backend_name(),
                    "Image bundle persisted"
                );
                Ok((record.image_path.clone(), record))
            }
            Err(e) => {
                // Blobs from this attempt are orphans without a record.
                error!(
                    image_path = %image_path,
                    error = %e,
                    "Failed to create metadata record, removing written blobs"
                );
                self.remove_blobs_best_effort(&paths).await;
                Err(MediaError::Metadata(e))
            }
        }
    }

    /// Process and persist in one call.
    pub async fn save_upload(
        &self,
        data: Bytes,
        filename: &str,
        category: ImageCategory,
        options: BundleOptions,
        uploaded_by: Option<Uuid>,
    ) -> Result<ImageMetadataRecord, MediaError> {
        let bundle = self.process(data, filename, category, options).await?;
        let (_, record) = self.save(bundle, uploaded_by).await?;
        Ok(record)
    }

    /// Servable URL for the blob at `path`, or `None` when the path is empty
    /// or the blob no longer exists.
    pub async fn resolve_url(&self, path: &str) -> Result<Option<String>, MediaError> {
        if path.is_empty() {
            return Ok(None);
        }
        if self.blobs.exists(path).await? {
            Ok(Some(self.blobs.url(path).await?))
        } else {
            Ok(None)
        }
    }

    /// URL of a record's primary artifact.
    pub async fn primary_url(
        &self,
        record: &ImageMetadataRecord,
    ) -> Result<Option<String>, MediaError> {
        self.resolve_url(&record.image_path).await
    }

    /// URL of a record's thumbnail, `None` when absent.
    pub async fn thumbnail_url(
        &self,
        record: &ImageMetadataRecord,
    ) -> Result<Option<String>, MediaError> {
        match record.thumbnail_path.as_deref() {
            Some(path) => self.resolve_url(path).await,
            None => Ok(None),
        }
    }

    /// URL of a record's high-res variant, `None` when absent.
    pub async fn high_res_url(
        &self,
        record: &ImageMetadataRecord,
    ) -> Result<Option<String>, MediaError> {
        match record.high_res_path.as_deref() {
            Some(path) => self.resolve_url(path).await,
            None => Ok(None),
        }
    }

    /// Delete whatever lives at `image_path`.
    ///
    /// With a metadata record, the full artifact set and the record go
    /// together. A bare blob without a record is deleted alone. Neither
    /// existing reports [`MediaError::NotFound`].
    pub async fn delete(&self, image_path: &str) -> Result<DeleteOutcome, MediaError> {
        match self.metadata.find_by_image_path(image_path).await? {
            Some(record) => {
                self.delete_record(&record).await?;
                Ok(DeleteOutcome::RecordAndBlobs)
            }
            None => {
                if self.blobs.exists(image_path).await? {
                    self.blobs.delete(image_path).await?;
                    info!(path = %image_path, "Deleted unrecorded blob");
                    Ok(DeleteOutcome::BlobOnly)
                } else {
                    Err(MediaError::NotFound(image_path.to_string()))
                }
            }
        }
    }

    /// Delete a record's blobs, then the record itself.
    ///
    /// Referenced blobs that are already gone are skipped, so a partially
    /// removed artifact set still deletes cleanly.
    pub async fn delete_record(&self, record: &ImageMetadataRecord) -> Result<(), MediaError> {
        let referenced = [
            Some(record.image_path.as_str()),
            record.thumbnail_path.as_deref(),
            record.high_res_path.as_deref(),
            record.original_path.as_deref(),
        ];
        for path in referenced.into_iter().flatten() {
            if self.blobs.exists(path).await? {
                self.blobs.delete(path).await?;
            }
        }

        self.metadata.delete_by_image_path(&record.image_path).await?;
        info!(
            image_path = %record.image_path,
            category = %record.category,
            "Deleted image bundle"
        );
        Ok(())
    }

    /// All records owned by one entity, newest first.
    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<Vec<ImageMetadataRecord>, MediaError> {
        Ok(self.metadata.list_for_entity(entity_type, entity_id).await?)
    }

    /// Verify both backing stores are reachable.
    pub async fn health_check(&self) -> Result<(), MediaError> {
        self.blobs.health_check().await?;
        self.metadata.health_check().await?;
        Ok(())
    }

    async fn remove_blobs_best_effort(&self, paths: &[String]) {
        for path in paths {
            match self.blobs.delete(path).await {
                Ok(()) | Err(StorageError::NotFound(_)) => {}
                Err(e) => {
                    warn!(path = %path, error = %e, "Failed to remove blob during rollback");
                }
            }
        }
    }
}
