//! Asset services.

pub mod store;

pub use store::AssetStore;
