//! Metadata store port and the `PostgreSQL` implementation.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;

use super::models::{ImageMetadataRecord, NewImageMetadata};
use super::queries;

/// Metadata persistence errors.
#[derive(Debug, Error)]
pub enum MetadataError {
    /// A record already claims this primary path.
    #[error("image path already recorded: {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence port for [`ImageMetadataRecord`] rows.
///
/// The production implementation is [`PgMetadataStore`]; tests substitute an
/// in-memory fake so no database is required.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Persist a new record. Fails with [`MetadataError::Duplicate`] when the
    /// primary path is already taken.
    async fn insert(&self, new: NewImageMetadata) -> Result<ImageMetadataRecord, MetadataError>;

    /// Look up the record owning `image_path` as its primary artifact.
    async fn find_by_image_path(
        &self,
        image_path: &str,
    ) -> Result<Option<ImageMetadataRecord>, MetadataError>;

    /// Remove the record for `image_path`, returning it if it existed.
    async fn delete_by_image_path(
        &self,
        image_path: &str,
    ) -> Result<Option<ImageMetadataRecord>, MetadataError>;

    /// All records owned by one entity, newest first.
    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<Vec<ImageMetadataRecord>, MetadataError>;

    /// Verify the store is reachable.
    async fn health_check(&self) -> Result<(), MetadataError>;
}

/// `PostgreSQL`-backed metadata store.
pub struct PgMetadataStore {
    pool: PgPool,
}

impl PgMetadataStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Access the underlying pool, e.g. for running migrations.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for PgMetadataStore {
    async fn insert(&self, new: NewImageMetadata) -> Result<ImageMetadataRecord, MetadataError> {
        let image_path = new.image_path.clone();
        queries::insert_image_metadata(&self.pool, &new)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(db_err) = &e {
                    if db_err.is_unique_violation() {
                        return MetadataError::Duplicate(image_path);
                    }
                }
                MetadataError::Database(e)
            })
    }

    async fn find_by_image_path(
        &self,
        image_path: &str,
    ) -> Result<Option<ImageMetadataRecord>, MetadataError> {
        Ok(queries::find_image_metadata_by_path(&self.pool, image_path).await?)
    }

    async fn delete_by_image_path(
        &self,
        image_path: &str,
    ) -> Result<Option<ImageMetadataRecord>, MetadataError> {
        Ok(queries::delete_image_metadata_by_path(&self.pool, image_path).await?)
    }

    async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: i64,
    ) -> Result<Vec<ImageMetadataRecord>, MetadataError> {
        Ok(queries::list_image_metadata_for_entity(&self.pool, entity_type, entity_id).await?)
    }

    async fn health_check(&self) -> Result<(), MetadataError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
