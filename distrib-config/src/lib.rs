//! Configuration for the distrib workspace.
//!
//! [`shared`] holds the types consumed by the pipeline, [`load`] the layered loader used by
//! binaries.

pub mod environment;
pub mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{CONFIGURATION_DIR, LoadConfigError, load_config_from};
