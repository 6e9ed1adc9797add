//! Database queries.
//!
//! Runtime queries (no compile-time `DATABASE_URL` required).
//!
//! All query functions include error context logging to aid debugging.

use sqlx::PgPool;
use tracing::error;

use super::models::{ImageMetadataRecord, NewImageMetadata};

/// Log and return a database error with context.
macro_rules! db_error {
    ($query:expr, $($field:tt)*) => {
        |e| {
            error!(query = $query, $($field)*, error = %e, "Database query failed");
            e
        }
    };
}

// ============================================================================
// Image Metadata Queries
// ============================================================================

/// Insert a metadata record, returning the stored row.
pub async fn insert_image_metadata(
    pool: &PgPool,
    new: &NewImageMetadata,
) -> sqlx::Result<ImageMetadataRecord> {
    sqlx::query_as::<_, ImageMetadataRecord>(
        "INSERT INTO image_metadata (
            image_path, thumbnail_path, high_res_path, original_path,
            category, entity_type, entity_id, width, height,
            file_size, original_file_size, format, content_type, uploaded_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING *",
    )
    .bind(&new.image_path)
    .bind(&new.thumbnail_path)
    .bind(&new.high_res_path)
    .bind(&new.original_path)
    .bind(new.category)
    .bind(&new.entity_type)
    .bind(new.entity_id)
    .bind(new.width)
    .bind(new.height)
    .bind(new.file_size)
    .bind(new.original_file_size)
    .bind(&new.format)
    .bind(&new.content_type)
    .bind(new.uploaded_by)
    .fetch_one(pool)
    .await
    .map_err(db_error!("insert_image_metadata", image_path = %new.image_path))
}

/// Find the record whose primary artifact lives at `image_path`.
pub async fn find_image_metadata_by_path(
    pool: &PgPool,
    image_path: &str,
) -> sqlx::Result<Option<ImageMetadataRecord>> {
    sqlx::query_as::<_, ImageMetadataRecord>("SELECT * FROM image_metadata WHERE image_path = $1")
        .bind(image_path)
        .fetch_optional(pool)
        .await
        .map_err(db_error!("find_image_metadata_by_path", image_path = %image_path))
}

/// Delete by primary artifact path, returning the removed row if it existed.
pub async fn delete_image_metadata_by_path(
    pool: &PgPool,
    image_path: &str,
) -> sqlx::Result<Option<ImageMetadataRecord>> {
    sqlx::query_as::<_, ImageMetadataRecord>(
        "DELETE FROM image_metadata WHERE image_path = $1 RETURNING *",
    )
    .bind(image_path)
    .fetch_optional(pool)
    .await
    .map_err(db_error!("delete_image_metadata_by_path", image_path = %image_path))
}

/// All records owned by one entity, newest first.
pub async fn list_image_metadata_for_entity(
    pool: &PgPool,
    entity_type: &str,
    entity_id: i64,
) -> sqlx::Result<Vec<ImageMetadataRecord>> {
    sqlx::query_as::<_, ImageMetadataRecord>(
        "SELECT * FROM image_metadata
         WHERE entity_type = $1 AND entity_id = $2
         ORDER BY created_at DESC",
    )
    .bind(entity_type)
    .bind(entity_id)
    .fetch_all(pool)
    .await
    .map_err(db_error!(
        "list_image_metadata_for_entity",
        entity_type = %entity_type,
        entity_id = %entity_id
    ))
}
