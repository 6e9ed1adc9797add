//! Storage path and filename generation.
//!
//! Paths are flat `/`-separated object keys, not OS paths; backends map them
//! onto their own layout. All artifacts of one upload share a directory and a
//! base filename so they can be discovered together by listing.

use std::path::Path;

use chrono::Utc;
use uuid::Uuid;

use crate::policy::ImageCategory;

/// Path segment used when the owning entity type is unknown.
pub const FALLBACK_ENTITY_TYPE: &str = "misc";

/// Path segment used when the owning entity has no id yet.
///
/// Callers must not rely on this segment for later lookup; it only keeps the
/// upload addressable until the entity exists.
pub const FALLBACK_ENTITY_ID: &str = "temp";

/// Lowercase extension of `filename` including the leading dot, or an empty
/// string when the name has no extension.
#[must_use]
pub fn file_extension(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
        .unwrap_or_default()
}

/// Collision-resistant filename for a new upload.
///
/// Format is `{UTC timestamp}_{8 hex chars}{original extension}`. The
/// original basename is discarded entirely; only its extension survives, even
/// when the encoded output format differs from it.
#[must_use]
pub fn unique_filename(original_filename: &str) -> String {
    let timestamp = Utc::now().format("%Y%m%d%H%M%S");
    let token = Uuid::new_v4().simple().to_string();
    let ext = file_extension(original_filename);
    format!("{timestamp}_{}{ext}", &token[..8])
}

/// Full storage path for a primary artifact:
/// `{entity_type}/{entity_id}/images/{category}/{filename}`.
#[must_use]
pub fn image_path(
    entity_type: &str,
    entity_id: Option<i64>,
    category: ImageCategory,
    filename: &str,
) -> String {
    let id_segment =
        entity_id.map_or_else(|| FALLBACK_ENTITY_ID.to_string(), |id| id.to_string());
    format!("{entity_type}/{id_segment}/images/{category}/{filename}")
}

/// Filename for the thumbnail variant of `filename`.
#[must_use]
pub fn thumbnail_filename(filename: &str) -> String {
    format!("thumb_{filename}")
}

/// Filename for the high-resolution variant of `filename`.
#[must_use]
pub fn high_res_filename(filename: &str) -> String {
    format!("highres_{filename}")
}

/// Path in the same directory as `path` but with a different filename.
#[must_use]
pub fn sibling_path(path: &str, filename: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) => format!("{dir}/{filename}"),
        None => filename.to_string(),
    }
}

/// Path under which the untouched source bytes are retained, next to the
/// primary artifact: `{dir}/originals/original_{filename}`.
#[must_use]
pub fn original_path(primary_path: &str) -> String {
    match primary_path.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/originals/original_{file}"),
        None => format!("originals/original_{primary_path}"),
    }
}
