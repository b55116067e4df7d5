//! Content-addressed attachment storage and per-project reference counting.
//!
//! Attachments and message parts blobs are stored once per content hash in
//! an object store. A separate counter keyed by `(project_id, sha256)`
//! records how many live rows point at each hash; when a counter reaches
//! zero the content becomes eligible for collection by an external process.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - The [`services::AssetStore`] orchestration service

pub mod adapters;
pub mod domain;
pub mod error;
pub mod ports;
pub mod services;
