//! Tasks extracted from sessions.
//!
//! Task rows are written by a background worker; this module stores them and
//! lists a session's tasks newest first with keyset cursors. The module
//! follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
