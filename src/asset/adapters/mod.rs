//! Object store and reference counter adapters.

pub mod memory;
pub mod opendal_store;
pub mod postgres;

pub use memory::{InMemoryAssetReferenceRepository, InMemoryObjectStore};
pub use opendal_store::{ObjectStoreConfig, OpendalObjectStore};
pub use postgres::PostgresAssetReferenceRepository;
