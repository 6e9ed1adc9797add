//! Database models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::policy::ImageCategory;

/// One row per completed upload, describing the full artifact set.
///
/// The row exists only once every referenced blob has been written; see the
/// persistence ordering in [`crate::service::MediaService::save`].
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ImageMetadataRecord {
    pub id: Uuid,
    /// Primary artifact path, unique across all records.
    pub image_path: String,
    pub thumbnail_path: Option<String>,
    pub high_res_path: Option<String>,
    /// Untouched source bytes, retained for future re-processing.
    pub original_path: Option<String>,
    pub category: ImageCategory,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub width: i32,
    pub height: i32,
    pub file_size: i64,
    pub original_file_size: Option<i64>,
    pub format: String,
    pub content_type: String,
    pub uploaded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImageMetadataRecord {
    /// Width over height of the stored primary artifact.
    #[must_use]
    pub fn aspect_ratio(&self) -> Option<f64> {
        (self.height != 0).then(|| f64::from(self.width) / f64::from(self.height))
    }

    #[must_use]
    pub fn file_size_kb(&self) -> f64 {
        self.file_size as f64 / 1024.0
    }

    #[must_use]
    pub fn original_file_size_kb(&self) -> Option<f64> {
        self.original_file_size.map(|size| size as f64 / 1024.0)
    }

    /// Ratio of upload size to stored size, when the upload size is known.
    #[must_use]
    pub fn compression_ratio(&self) -> Option<f64> {
        match (self.original_file_size, self.file_size) {
            (Some(original), processed) if processed > 0 => {
                Some(original as f64 / processed as f64)
            }
            _ => None,
        }
    }
}

/// Fields for a new metadata row. Id and timestamps are database-assigned.
#[derive(Debug, Clone)]
pub struct NewImageMetadata {
    pub image_path: String,
    pub thumbnail_path: Option<String>,
    pub high_res_path: Option<String>,
    pub original_path: Option<String>,
    pub category: ImageCategory,
    pub entity_type: String,
    pub entity_id: Option<i64>,
    pub width: i32,
    pub height: i32,
    pub file_size: i64,
    pub original_file_size: Option<i64>,
    pub format: String,
    pub content_type: String,
    pub uploaded_by: Option<Uuid>,
}
