//! Step definitions for message pipeline scenarios.

mod given;
mod then;
mod when;
pub mod world;
