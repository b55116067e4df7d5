//! Part validation.
//!
//! Pure per-type rules plus the default validator combining them.

pub mod rules;
pub mod service;

pub use service::DefaultPartValidator;
