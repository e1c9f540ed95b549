//! Configuration objects for distribution runs.
//!
//! This module contains re-exported configurations from `distrib-config`.

// Re-exports.
pub use distrib_config::shared::*;
