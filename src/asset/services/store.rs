//! Content-addressed asset store over an [`ObjectStore`].

use serde::{Serialize, de::DeserializeOwned};
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::asset::{
    domain::Asset,
    error::{StorageError, StorageResult},
    ports::ObjectStore,
};

const JSON_MIME: &str = "application/json";
const FALLBACK_MIME: &str = "application/octet-stream";

/// Uploads, downloads, and presigns content-addressed assets.
///
/// Object keys are derived as `{namespace}/{sha256}.{extension}`, so
/// byte-identical uploads within a namespace land on the same object.
/// Every backend call is bounded by the configured timeout.
pub struct AssetStore<S>
where
    S: ObjectStore,
{
    store: Arc<S>,
    timeout: Duration,
}

impl<S> Clone for AssetStore<S>
where
    S: ObjectStore,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            timeout: self.timeout,
        }
    }
}

impl<S> AssetStore<S>
where
    S: ObjectStore,
{
    /// Creates an asset store bounding each backend call by `timeout`.
    #[must_use]
    pub const fn new(store: Arc<S>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Returns the hex-encoded SHA-256 of `content`.
    #[must_use]
    pub fn content_hash(content: &[u8]) -> String {
        hex::encode(Sha256::digest(content))
    }

    /// Picks a MIME type from an explicit content type or a filename.
    #[must_use]
    pub fn resolve_mime(content_type: Option<&str>, filename: Option<&str>) -> String {
        content_type
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .or_else(|| {
                filename.and_then(|name| mime_guess::from_path(name).first_raw().map(str::to_owned))
            })
            .unwrap_or_else(|| FALLBACK_MIME.to_owned())
    }

    /// Stores `payload` under the namespace and returns its descriptor.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the write fails or times out.
    pub async fn upload(&self, namespace: &str, payload: Vec<u8>, mime: &str) -> StorageResult<Asset> {
        let sha256 = Self::content_hash(&payload);
        let key = object_key(namespace, &sha256, mime);
        let size_bytes = payload.len() as u64;

        debug!(%key, size_bytes, %mime, "uploading asset");
        let stored = self
            .bounded("put", &key, self.store.put(&key, payload, mime))
            .await?;

        Ok(Asset {
            bucket: stored.bucket,
            key: stored.key,
            etag: stored.etag,
            sha256,
            mime: mime.to_owned(),
            size_bytes,
        })
    }

    /// Serializes `value` as JSON and stores it as one blob.
    ///
    /// # Errors
    ///
    /// Returns a storage error when serialization or the write fails.
    pub async fn upload_json<T>(&self, namespace: &str, value: &T) -> StorageResult<Asset>
    where
        T: Serialize + ?Sized + Sync,
    {
        let payload =
            serde_json::to_vec(value).map_err(|err| StorageError::serialization(namespace, err))?;
        self.upload(namespace, payload, JSON_MIME).await
    }

    /// Reads the raw bytes stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the read fails or times out.
    pub async fn download(&self, key: &str) -> StorageResult<Vec<u8>> {
        self.bounded("get", key, self.store.get(key)).await
    }

    /// Reads and deserializes a JSON blob stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the read fails or the blob does not
    /// decode as `T`.
    pub async fn download_json<T>(&self, key: &str) -> StorageResult<T>
    where
        T: DeserializeOwned,
    {
        let bytes = self.download(key).await?;
        serde_json::from_slice(&bytes).map_err(|err| StorageError::serialization(key, err))
    }

    /// Produces a time-limited read URL for `key`.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the backend cannot presign.
    pub async fn presign_get(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        self.bounded("presign", key, self.store.presign_get(key, ttl))
            .await
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        key: &str,
        call: impl Future<Output = StorageResult<T>>,
    ) -> StorageResult<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| StorageError::Timeout {
                operation,
                key: key.to_owned(),
                elapsed: self.timeout,
            })?
    }
}

fn object_key(namespace: &str, sha256: &str, mime: &str) -> String {
    let prefix = namespace.trim_end_matches('/');
    format!("{prefix}/{sha256}.{}", extension_from_mime(mime))
}

fn extension_from_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "application/pdf" => "pdf",
        "application/json" => "json",
        "text/plain" => "txt",
        "audio/mpeg" => "mp3",
        "audio/wav" => "wav",
        "video/mp4" => "mp4",
        other => mime_guess::get_mime_extensions_str(other)
            .and_then(|extensions| extensions.first().copied())
            .unwrap_or("bin"),
    }
}
