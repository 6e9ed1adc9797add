//! Per-category image policies.
//!
//! Every upload is processed under an [`ImageSpec`] chosen by its
//! [`ImageCategory`]. The built-in table mirrors the product's four usage
//! categories; tests and embedders can override individual specs through
//! [`PolicyTable::with_spec`] without touching shared state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when parsing a category string that matches no known category.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown image category: {0}")]
pub struct UnknownCategory(pub String);

/// Usage category of an uploaded image.
///
/// The set is closed: every category carries a spec in the [`PolicyTable`],
/// so lookups cannot fail at runtime. Unknown strings are rejected at the
/// parse boundary instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "image_category", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ImageCategory {
    Profile,
    Logo,
    Venue,
    Thumbnail,
}

impl ImageCategory {
    pub const ALL: [Self; 4] = [Self::Profile, Self::Logo, Self::Venue, Self::Thumbnail];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Logo => "logo",
            Self::Venue => "venue",
            Self::Thumbnail => "thumbnail",
        }
    }
}

impl fmt::Display for ImageCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "profile" => Ok(Self::Profile),
            "logo" => Ok(Self::Logo),
            "venue" => Ok(Self::Venue),
            "thumbnail" => Ok(Self::Thumbnail),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// Output encoding for processed artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    /// Canonical name stored in the metadata record's `format` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Jpeg => "JPEG",
            Self::Png => "PNG",
        }
    }

    /// MIME type served alongside the encoded bytes.
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing policy for one category.
#[derive(Debug, Clone)]
pub struct ImageSpec {
    /// Encoding of the primary (and high-res) artifact.
    pub format: OutputFormat,
    /// Encoder quality, 1-100. Ignored by the PNG path except as intent.
    pub quality: u8,
    /// Exact output width in pixels.
    pub target_width: u32,
    /// Exact output height in pixels.
    pub target_height: u32,
    /// Width/height ratio to crop to before resizing. `None` skips the crop
    /// and resizes directly, which may distort; accepted for logos.
    pub target_aspect_ratio: Option<f64>,
    /// Uploads larger than this many bytes are rejected before decoding.
    pub max_upload_bytes: usize,
    /// Lowercase extensions (with leading dot) accepted for this category.
    pub allowed_extensions: &'static [&'static str],
    /// Extra derivative rendered from a second decode of the source.
    pub high_res_target: Option<(u32, u32)>,
}

const DEFAULT_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png"];
const LOGO_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg"];

/// Immutable mapping from category to spec.
///
/// Construct once and share; the table is read-only after creation.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    profile: ImageSpec,
    logo: ImageSpec,
    venue: ImageSpec,
    thumbnail: ImageSpec,
}

impl PolicyTable {
    /// The built-in production table.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            profile: ImageSpec {
                format: OutputFormat::Jpeg,
                quality: 85,
                target_width: 800,
                target_height: 800,
                target_aspect_ratio: Some(1.0),
                max_upload_bytes: 100 * 1024,
                allowed_extensions: DEFAULT_EXTENSIONS,
                high_res_target: None,
            },
            logo: ImageSpec {
                format: OutputFormat::Png,
                quality: 90,
                target_width: 500,
                target_height: 500,
                target_aspect_ratio: None,
                max_upload_bytes: 150 * 1024,
                allowed_extensions: LOGO_EXTENSIONS,
                high_res_target: Some((1000, 1000)),
            },
            venue: ImageSpec {
                format: OutputFormat::Jpeg,
                quality: 90,
                target_width: 1200,
                target_height: 800,
                target_aspect_ratio: Some(1.5),
                max_upload_bytes: 500 * 1024,
                allowed_extensions: DEFAULT_EXTENSIONS,
                high_res_target: None,
            },
            thumbnail: ImageSpec {
                format: OutputFormat::Jpeg,
                quality: 80,
                target_width: 300,
                target_height: 200,
                target_aspect_ratio: Some(1.5),
                max_upload_bytes: 50 * 1024,
                allowed_extensions: DEFAULT_EXTENSIONS,
                high_res_target: None,
            },
        }
    }

    /// Spec for `category`. Total over the closed category set.
    #[must_use]
    pub fn spec_for(&self, category: ImageCategory) -> &ImageSpec {
        match category {
            ImageCategory::Profile => &self.profile,
            ImageCategory::Logo => &self.logo,
            ImageCategory::Venue => &self.venue,
            ImageCategory::Thumbnail => &self.thumbnail,
        }
    }

    /// Returns a copy of the table with one category's spec replaced.
    #[must_use]
    pub fn with_spec(mut self, category: ImageCategory, spec: ImageSpec) -> Self {
        match category {
            ImageCategory::Profile => self.profile = spec,
            ImageCategory::Logo => self.logo = spec,
            ImageCategory::Venue => self.venue = spec,
            ImageCategory::Thumbnail => self.thumbnail = spec,
        }
        self
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::builtin()
    }
}
