//! Ports for object storage and per-project reference counting.

use super::domain::{Asset, AssetReference};
use super::error::StorageResult;
use crate::ids::ProjectId;
use crate::persistence::RepositoryResult;
use async_trait::async_trait;
use std::time::Duration;

/// Location and entity tag of an object written to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Bucket (or backend root) holding the object.
    pub bucket: String,
    /// Object key.
    pub key: String,
    /// Entity tag reported by the backend.
    pub etag: String,
}

/// Object storage capability: keyed put, get, and presigned read.
///
/// Writes are idempotent for a given key and content, so callers may retry
/// them freely.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `bytes` under `key`, replacing any previous object.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the backend rejects the write.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str)
    -> StorageResult<StoredObject>;

    /// Reads the object stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`super::error::StorageError::NotFound`] when no object exists.
    async fn get(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Produces a URL granting read access to `key` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the backend cannot presign.
    async fn presign_get(&self, key: &str, ttl: Duration) -> StorageResult<String>;
}

/// Per-project reference counters keyed by content hash.
///
/// Batches are grouped by hash and applied atomically: either every counter
/// in the batch changes or none does.
#[async_trait]
pub trait AssetReferenceRepository: Send + Sync {
    /// Adds one reference per occurrence of each asset in `assets`.
    ///
    /// # Errors
    ///
    /// Returns a repository error when the counters cannot be updated.
    async fn batch_increment(&self, project_id: ProjectId, assets: &[Asset])
    -> RepositoryResult<()>;

    /// Removes one reference per occurrence of each asset in `assets`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::persistence::RepositoryError::ReferenceUnderflow`]
    /// when any counter would drop below zero; no counter is changed.
    async fn batch_decrement(&self, project_id: ProjectId, assets: &[Asset])
    -> RepositoryResult<()>;

    /// Returns the counter for `sha256`, or `None` when it was never created.
    ///
    /// # Errors
    ///
    /// Returns a repository error when the lookup fails.
    async fn ref_count(&self, project_id: ProjectId, sha256: &str)
    -> RepositoryResult<Option<i64>>;

    /// Lists counters that reached zero; their content may be collected.
    ///
    /// # Errors
    ///
    /// Returns a repository error when the lookup fails.
    async fn list_unreferenced(&self, project_id: ProjectId)
    -> RepositoryResult<Vec<AssetReference>>;
}
