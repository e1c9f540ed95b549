//! Concurrent task distribution with per-task deadlines.
//!
//! A run pushes a finite sequence of [`Work`] items through three stages: a dispatcher feeding
//! tasks in order, a fixed pool of workers racing every task against its deadline, and a
//! collector that accumulates completed tasks until enough of them arrived. Tasks that miss their
//! deadline are abandoned and left out of the result.
//!
//! ```no_run
//! use distrib::config::DistribConfig;
//! use distrib::pipeline::distribute;
//!
//! # async fn run() -> distrib::error::DistribResult<()> {
//! let items = (0..20).map(|_| || {});
//! let packets = distribute(items, &DistribConfig::default()).await?;
//! for packet in &packets {
//!     println!("{packet}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod concurrency;
pub mod config;
pub mod error;
mod macros;
pub mod metrics;
pub mod pipeline;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
pub mod types;
pub mod workers;

pub use pipeline::{DistribReport, Distributor, distribute};
pub use types::{Packet, TaskId, Work, WorkerId};
