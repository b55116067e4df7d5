//! Content-addressed attachment descriptors and reference counters.

use crate::ids::ProjectId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Descriptor of a stored attachment or parts blob.
///
/// Two assets with the same `sha256` hold the same content; reference
/// counting identifies an asset by `(project_id, sha256)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    /// Bucket (or backend root) holding the object.
    pub bucket: String,
    /// Object key within the bucket.
    pub key: String,
    /// Entity tag reported by the object store.
    pub etag: String,
    /// Hex-encoded SHA-256 of the content.
    pub sha256: String,
    /// MIME type of the content.
    pub mime: String,
    /// Content length in bytes.
    pub size_bytes: u64,
}

impl Asset {
    /// Returns the `sha256:<hex>` content address of this asset.
    ///
    /// # Examples
    ///
    /// ```
    /// use colloquy::asset::domain::Asset;
    ///
    /// let asset = Asset {
    ///     bucket: "local".to_owned(),
    ///     key: "assets/p/abc.png".to_owned(),
    ///     etag: "abc".to_owned(),
    ///     sha256: "abc".to_owned(),
    ///     mime: "image/png".to_owned(),
    ///     size_bytes: 3,
    /// };
    /// assert_eq!(asset.content_address(), "sha256:abc");
    /// ```
    #[must_use]
    pub fn content_address(&self) -> String {
        format!("sha256:{}", self.sha256)
    }
}

/// Counts how many times each content hash occurs in `assets`.
///
/// The result is the per-hash delta a batch increment or decrement applies.
#[must_use]
pub fn reference_counts<'a>(assets: impl IntoIterator<Item = &'a Asset>) -> BTreeMap<String, i64> {
    let mut counts = BTreeMap::new();
    for asset in assets {
        *counts.entry(asset.sha256.clone()).or_insert(0_i64) += 1;
    }
    counts
}

/// A per-project reference counter for one content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetReference {
    /// Owning project.
    pub project_id: ProjectId,
    /// Content address.
    pub sha256: String,
    /// Number of live references.
    pub ref_count: i64,
}

/// A time-limited URL for direct client retrieval of an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicUrl {
    /// Presigned URL.
    pub url: String,
    /// Instant after which the URL stops working.
    pub expire_at: DateTime<Utc>,
}
