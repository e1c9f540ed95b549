//! Utilities for testing distribution runs.
//!
//! - [`work`] has ready-made [`crate::types::Work`] implementations with controllable duration
//!   and failure, plus workload builders.
//! - [`config`] has a builder for test configurations.
//! - [`timed`] bounds how long a test may wait for a run.

pub mod config;
pub mod timed;
pub mod work;
