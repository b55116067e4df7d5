//! In-memory object store and reference counter.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::error;

use crate::asset::{
    domain::{Asset, AssetReference, reference_counts},
    error::{StorageError, StorageResult},
    ports::{AssetReferenceRepository, ObjectStore, StoredObject},
};
use crate::ids::ProjectId;
use crate::persistence::{
    RepositoryError, RepositoryResult,
    memory::{InMemoryDatabase, Tables},
};

#[derive(Debug, Clone)]
struct StoredBlob {
    bytes: Vec<u8>,
    content_type: String,
}

/// Thread-safe object store holding blobs in process memory.
#[derive(Debug, Clone)]
pub struct InMemoryObjectStore {
    bucket: String,
    objects: Arc<RwLock<HashMap<String, StoredBlob>>>,
}

impl InMemoryObjectStore {
    /// Creates an empty store reporting `bucket` in its descriptors.
    #[must_use]
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the number of stored objects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.read().map_or(0, |objects| objects.len())
    }

    /// Returns `true` when nothing has been stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the content type recorded for `key`.
    #[must_use]
    pub fn content_type(&self, key: &str) -> Option<String> {
        self.objects
            .read()
            .ok()
            .and_then(|objects| objects.get(key).map(|blob| blob.content_type.clone()))
    }

    /// Removes the object under `key`, simulating out-of-band loss.
    pub fn evict(&self, key: &str) {
        if let Ok(mut objects) = self.objects.write() {
            objects.remove(key);
        }
    }
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new("memory")
    }
}

fn poisoned(err: impl std::fmt::Display) -> StorageError {
    StorageError::Io(std::io::Error::other(format!("lock poisoned: {err}")))
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        let etag = hex::encode(Sha256::digest(&bytes));
        let mut objects = self.objects.write().map_err(poisoned)?;
        objects.insert(
            key.to_owned(),
            StoredBlob {
                bytes,
                content_type: content_type.to_owned(),
            },
        );
        Ok(StoredObject {
            bucket: self.bucket.clone(),
            key: key.to_owned(),
            etag,
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        let objects = self.objects.read().map_err(poisoned)?;
        objects
            .get(key)
            .map(|blob| blob.bytes.clone())
            .ok_or_else(|| StorageError::not_found(key))
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        let objects = self.objects.read().map_err(poisoned)?;
        if !objects.contains_key(key) {
            return Err(StorageError::not_found(key));
        }
        Ok(format!(
            "memory://{}/{}?expires_in={}",
            self.bucket,
            key,
            ttl.as_secs()
        ))
    }
}

impl Tables {
    pub(crate) fn increment_references(
        &mut self,
        project_id: ProjectId,
        counts: &BTreeMap<String, i64>,
    ) {
        for (sha256, delta) in counts {
            *self
                .references
                .entry((project_id, sha256.clone()))
                .or_insert(0) += delta;
        }
    }

    /// Checks every counter before touching any, so a failing batch leaves
    /// all counters unchanged.
    pub(crate) fn decrement_references(
        &mut self,
        project_id: ProjectId,
        counts: &BTreeMap<String, i64>,
    ) -> RepositoryResult<()> {
        for (sha256, delta) in counts {
            let current = self
                .references
                .get(&(project_id, sha256.clone()))
                .copied()
                .unwrap_or(0);
            if current < *delta {
                error!(
                    %project_id,
                    sha256 = %sha256,
                    current,
                    requested = delta,
                    "asset reference count underflow"
                );
                return Err(RepositoryError::ReferenceUnderflow {
                    project_id,
                    sha256: sha256.clone(),
                    current,
                    requested: *delta,
                });
            }
        }

        for (sha256, delta) in counts {
            if let Some(count) = self.references.get_mut(&(project_id, sha256.clone())) {
                *count -= delta;
            }
        }
        Ok(())
    }
}

/// Reference counter over the shared in-memory database.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssetReferenceRepository {
    database: InMemoryDatabase,
}

impl InMemoryAssetReferenceRepository {
    /// Creates a counter over `database`.
    #[must_use]
    pub const fn new(database: InMemoryDatabase) -> Self {
        Self { database }
    }
}

#[async_trait]
impl AssetReferenceRepository for InMemoryAssetReferenceRepository {
    async fn batch_increment(
        &self,
        project_id: ProjectId,
        assets: &[Asset],
    ) -> RepositoryResult<()> {
        let counts = reference_counts(assets);
        self.database
            .write()?
            .increment_references(project_id, &counts);
        Ok(())
    }

    async fn batch_decrement(
        &self,
        project_id: ProjectId,
        assets: &[Asset],
    ) -> RepositoryResult<()> {
        let counts = reference_counts(assets);
        self.database
            .write()?
            .decrement_references(project_id, &counts)
    }

    async fn ref_count(&self, project_id: ProjectId, sha256: &str) -> RepositoryResult<Option<i64>> {
        let tables = self.database.read()?;
        Ok(tables
            .references
            .get(&(project_id, sha256.to_owned()))
            .copied())
    }

    async fn list_unreferenced(
        &self,
        project_id: ProjectId,
    ) -> RepositoryResult<Vec<AssetReference>> {
        let tables = self.database.read()?;
        let mut unreferenced: Vec<AssetReference> = tables
            .references
            .iter()
            .filter(|((owner, _), count)| *owner == project_id && **count == 0)
            .map(|((owner, sha256), count)| AssetReference {
                project_id: *owner,
                sha256: sha256.clone(),
                ref_count: *count,
            })
            .collect();
        unreferenced.sort_by(|left, right| left.sha256.cmp(&right.sha256));
        Ok(unreferenced)
    }
}
