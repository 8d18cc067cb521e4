//! Breed records as seen upstream and as stored locally

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Returns true if `key` belongs to a pinned (locally curated) record
///
/// Pinned records are never removed by reconciliation. An empty prefix pins
/// nothing.
pub fn is_pinned_key(key: &str, prefix: &str) -> bool {
    !prefix.is_empty() && key.starts_with(prefix)
}

/// One record as returned by the upstream API
///
/// Fields other than `breed` and `image` (e.g. `video`) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Breed name, the record key
    pub breed: String,

    /// Image reference, usually a URL
    #[serde(default)]
    pub image: Option<String>,
}

impl RawRecord {
    /// Create a new raw record
    pub fn new(breed: impl Into<String>, image: Option<&str>) -> Self {
        Self {
            breed: breed.into(),
            image: image.map(String::from),
        }
    }

    /// The image value if present and not blank
    pub fn image_value(&self) -> Option<&str> {
        self.image.as_deref().filter(|image| !image.is_empty())
    }
}

/// A breed in the local mirror
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breed {
    /// Breed name; immutable once created
    pub breed: String,

    /// Image reference
    pub image: Option<String>,

    /// When the record was last written
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Breed {
    /// Create a new breed record
    pub fn new(breed: impl Into<String>, image: Option<&str>) -> Self {
        Self {
            breed: breed.into(),
            image: image.map(String::from),
            updated_at: None,
        }
    }

    /// Check whether this record is protected from removal
    pub fn is_pinned(&self, prefix: &str) -> bool {
        is_pinned_key(&self.breed, prefix)
    }

    /// Returns the new image if `remote` carries one that differs from ours
    pub fn image_change<'a>(&self, remote: &'a RawRecord) -> Option<&'a str> {
        remote
            .image_value()
            .filter(|image| self.image.as_deref() != Some(*image))
    }
}

impl From<&RawRecord> for Breed {
    fn from(raw: &RawRecord) -> Self {
        Self {
            breed: raw.breed.clone(),
            image: raw.image.clone(),
            updated_at: None,
        }
    }
}

/// One page of the local catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreedPage {
    /// Breeds on this page, in insertion order
    pub breeds: Vec<Breed>,

    /// 1-based page number
    pub page: u32,

    /// Whether the listing was served from the cache
    pub cached: bool,

    /// Number of breeds in the whole catalog
    pub total_breeds: u64,

    /// Number of pages at the configured page size
    pub total_pages: u64,
}
