use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::shared::ValidationError;

/// Controls what the collector does once enough results have arrived.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownMode {
    /// Stop loading new tasks, then wait until every task still considered in flight has
    /// either arrived or been abandoned to its timeout before closing the pipeline.
    #[default]
    GracefulDrain,
    /// Close the pipeline the instant the target is reached, discarding in-flight results.
    Abandon,
}

impl ShutdownMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShutdownMode::GracefulDrain => "graceful_drain",
            ShutdownMode::Abandon => "abandon",
        }
    }
}

impl fmt::Display for ShutdownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a single distribution run.
///
/// Every field has a serde default, so an empty document deserializes to
/// [`DistribConfig::default`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DistribConfig {
    /// Number of concurrent workers executing tasks.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Number of completed results after which shutdown begins.
    #[serde(default = "default_want")]
    pub want: usize,
    /// Deadline, in milliseconds, after which a worker stops waiting on a task.
    #[serde(default = "default_task_timeout_ms")]
    pub task_timeout_ms: u64,
    /// How the pipeline shuts down once `want` results arrived.
    #[serde(default)]
    pub shutdown_mode: ShutdownMode,
    /// Whether to sleep briefly after shutdown so straggler log output can settle.
    #[serde(default)]
    pub trailing_pause: bool,
    /// Interval, in milliseconds, at which the collector re-evaluates termination.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Capacity of the channel between the dispatcher and the workers.
    #[serde(default = "default_handoff_capacity")]
    pub handoff_capacity: usize,
}

impl DistribConfig {
    pub const DEFAULT_WORKER_COUNT: usize = 6;

    pub const DEFAULT_WANT: usize = 10;

    pub const DEFAULT_TASK_TIMEOUT_MS: u64 = 15;

    pub const DEFAULT_TICK_INTERVAL_MS: u64 = 10;

    pub const DEFAULT_HANDOFF_CAPACITY: usize = 1;

    /// Duration of the optional sleep after shutdown.
    pub const TRAILING_PAUSE: Duration = Duration::from_millis(60);

    /// Validates that the configuration can drive a pipeline to termination.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.worker_count == 0 {
            return Err(ValidationError::WorkerCountZero);
        }

        if self.task_timeout_ms == 0 {
            return Err(ValidationError::TaskTimeoutZero);
        }

        if self.tick_interval_ms == 0 {
            return Err(ValidationError::TickIntervalZero);
        }

        if self.handoff_capacity == 0 {
            return Err(ValidationError::HandoffCapacityZero);
        }

        Ok(())
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Returns `true` when the collector waits for in-flight tasks before closing.
    pub fn collects_remainder(&self) -> bool {
        self.shutdown_mode == ShutdownMode::GracefulDrain
    }
}

impl Default for DistribConfig {
    fn default() -> Self {
        Self {
            worker_count: default_worker_count(),
            want: default_want(),
            task_timeout_ms: default_task_timeout_ms(),
            shutdown_mode: ShutdownMode::default(),
            trailing_pause: false,
            tick_interval_ms: default_tick_interval_ms(),
            handoff_capacity: default_handoff_capacity(),
        }
    }
}

fn default_worker_count() -> usize {
    DistribConfig::DEFAULT_WORKER_COUNT
}

fn default_want() -> usize {
    DistribConfig::DEFAULT_WANT
}

fn default_task_timeout_ms() -> u64 {
    DistribConfig::DEFAULT_TASK_TIMEOUT_MS
}

fn default_tick_interval_ms() -> u64 {
    DistribConfig::DEFAULT_TICK_INTERVAL_MS
}

fn default_handoff_capacity() -> usize {
    DistribConfig::DEFAULT_HANDOFF_CAPACITY
}
