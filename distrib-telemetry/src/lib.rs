//! Logging and metrics setup shared by the distrib binaries and tests.

pub mod metrics;
pub mod tracing;
