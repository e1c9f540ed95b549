//! Shared configuration types for distribution runs.

mod base;
mod distrib;
mod runner;

pub use base::ValidationError;
pub use distrib::{DistribConfig, ShutdownMode};
pub use runner::{RunnerConfig, WorkloadConfig};
