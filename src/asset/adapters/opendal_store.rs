//! Object store backed by `OpenDAL`.
//!
//! The backend is chosen from environment variables:
//!
//! - `COLLOQUY_STORAGE_BACKEND`: `fs` (default), `s3`, or `memory`
//!
//! ### For the filesystem backend
//! - `COLLOQUY_STORAGE_FS_ROOT`: root directory (default: `./data/objects`)
//!
//! ### For the S3 backend
//! - `COLLOQUY_STORAGE_S3_BUCKET`: bucket name (required)
//! - `COLLOQUY_STORAGE_S3_REGION`: region (required)
//! - `COLLOQUY_STORAGE_S3_ENDPOINT`: endpoint for S3-compatible services (optional)
//! - `COLLOQUY_STORAGE_S3_ACCESS_KEY_ID`: access key (optional, default credentials otherwise)
//! - `COLLOQUY_STORAGE_S3_SECRET_ACCESS_KEY`: secret key (optional)

use async_trait::async_trait;
use opendal::{ErrorKind, Operator, services};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{debug, info};

use crate::asset::{
    error::{StorageError, StorageResult},
    ports::{ObjectStore, StoredObject},
};

const DEFAULT_FS_ROOT: &str = "./data/objects";

/// Storage backend selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectStoreConfig {
    /// Local filesystem rooted at `root`.
    Fs {
        /// Root directory.
        root: String,
    },
    /// S3 or an S3-compatible service.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Region name.
        region: String,
        /// Custom endpoint.
        endpoint: Option<String>,
        /// Access key identifier.
        access_key_id: Option<String>,
        /// Secret access key.
        secret_access_key: Option<String>,
    },
    /// Process-local memory, for development.
    Memory,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self::Fs {
            root: DEFAULT_FS_ROOT.to_owned(),
        }
    }
}

impl ObjectStoreConfig {
    /// Reads the configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::MissingEnvVar`] when the S3 backend is
    /// selected without its required variables.
    pub fn from_env() -> StorageResult<Self> {
        let backend = std::env::var("COLLOQUY_STORAGE_BACKEND")
            .unwrap_or_else(|_| "fs".to_owned())
            .to_lowercase();

        match backend.as_str() {
            "s3" => {
                let bucket = required_var("COLLOQUY_STORAGE_S3_BUCKET")?;
                let region = required_var("COLLOQUY_STORAGE_S3_REGION")?;
                Ok(Self::S3 {
                    bucket,
                    region,
                    endpoint: std::env::var("COLLOQUY_STORAGE_S3_ENDPOINT").ok(),
                    access_key_id: std::env::var("COLLOQUY_STORAGE_S3_ACCESS_KEY_ID").ok(),
                    secret_access_key: std::env::var("COLLOQUY_STORAGE_S3_SECRET_ACCESS_KEY")
                        .ok(),
                })
            }
            "memory" => Ok(Self::Memory),
            _ => {
                let root = std::env::var("COLLOQUY_STORAGE_FS_ROOT")
                    .unwrap_or_else(|_| DEFAULT_FS_ROOT.to_owned());
                Ok(Self::Fs { root })
            }
        }
    }

    /// Returns the backend name used in logs and errors.
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::Fs { .. } => "fs",
            Self::S3 { .. } => "s3",
            Self::Memory => "memory",
        }
    }

    fn bucket_name(&self) -> String {
        match self {
            Self::Fs { root } => root.clone(),
            Self::S3 { bucket, .. } => bucket.clone(),
            Self::Memory => "memory".to_owned(),
        }
    }
}

fn required_var(name: &str) -> StorageResult<String> {
    std::env::var(name).map_err(|_| StorageError::missing_env_var(name))
}

/// [`ObjectStore`] implementation over an `OpenDAL` operator.
#[derive(Debug, Clone)]
pub struct OpendalObjectStore {
    operator: Operator,
    config: ObjectStoreConfig,
}

impl OpendalObjectStore {
    /// Creates a store for the given backend configuration.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the operator cannot be built.
    pub fn new(config: ObjectStoreConfig) -> StorageResult<Self> {
        let operator = create_operator(&config)?;
        Ok(Self { operator, config })
    }

    /// Creates a store configured from environment variables.
    ///
    /// # Errors
    ///
    /// Returns a storage error when the configuration is invalid or the
    /// operator cannot be built.
    pub fn from_env() -> StorageResult<Self> {
        let config = ObjectStoreConfig::from_env()?;
        info!(backend = config.backend_name(), "initializing object store");
        Self::new(config)
    }

    /// Returns the backend configuration.
    #[must_use]
    pub const fn config(&self) -> &ObjectStoreConfig {
        &self.config
    }
}

fn create_operator(config: &ObjectStoreConfig) -> StorageResult<Operator> {
    match config {
        ObjectStoreConfig::Fs { root } => {
            debug!(%root, "creating filesystem storage operator");
            std::fs::create_dir_all(root)?;
            let builder = services::Fs::default().root(root);
            Ok(Operator::new(builder)?.finish())
        }
        ObjectStoreConfig::S3 {
            bucket,
            region,
            endpoint,
            access_key_id,
            secret_access_key,
        } => {
            debug!(%bucket, "creating S3 storage operator");
            let mut builder = services::S3::default().bucket(bucket).region(region);
            if let Some(ep) = endpoint {
                builder = builder.endpoint(ep);
            }
            if let Some(key_id) = access_key_id {
                builder = builder.access_key_id(key_id);
            }
            if let Some(secret) = secret_access_key {
                builder = builder.secret_access_key(secret);
            }
            Ok(Operator::new(builder)?.finish())
        }
        ObjectStoreConfig::Memory => Ok(Operator::new(services::Memory::default())?.finish()),
    }
}

#[async_trait]
impl ObjectStore for OpendalObjectStore {
    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> StorageResult<StoredObject> {
        let digest = hex::encode(Sha256::digest(&bytes));
        debug!(%key, size = bytes.len(), %content_type, "writing object");

        if self.operator.info().full_capability().write_with_content_type {
            self.operator
                .write_with(key, bytes)
                .content_type(content_type)
                .await?;
        } else {
            self.operator.write(key, bytes).await?;
        }

        let etag = match self.operator.stat(key).await {
            Ok(metadata) => metadata
                .etag()
                .map(|tag| tag.trim_matches('"').to_owned())
                .unwrap_or(digest),
            Err(err) if err.kind() == ErrorKind::Unsupported => digest,
            Err(err) => return Err(err.into()),
        };

        Ok(StoredObject {
            bucket: self.config.bucket_name(),
            key: key.to_owned(),
            etag,
        })
    }

    async fn get(&self, key: &str) -> StorageResult<Vec<u8>> {
        debug!(%key, "reading object");
        let buffer = self.operator.read(key).await.map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                StorageError::not_found(key)
            } else {
                StorageError::from(e)
            }
        })?;
        Ok(buffer.to_vec())
    }

    async fn presign_get(&self, key: &str, ttl: Duration) -> StorageResult<String> {
        match self.operator.presign_read(key, ttl).await {
            Ok(request) => Ok(request.uri().to_string()),
            Err(err) if err.kind() == ErrorKind::Unsupported => Err(
                StorageError::PresignUnsupported(self.config.backend_name().to_owned()),
            ),
            Err(err) => Err(err.into()),
        }
    }
}
