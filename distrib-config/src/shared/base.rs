use thiserror::Error;

/// Errors raised when a configuration is structurally valid but semantically unusable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The worker pool must contain at least one worker.
    #[error("`worker_count` cannot be zero")]
    WorkerCountZero,
    /// A zero deadline would abandon every task before it starts.
    #[error("`task_timeout_ms` cannot be zero")]
    TaskTimeoutZero,
    /// The collector needs a non-zero tick to re-evaluate termination.
    #[error("`tick_interval_ms` cannot be zero")]
    TickIntervalZero,
    /// Bounded channels require a capacity of at least one.
    #[error("`handoff_capacity` cannot be zero")]
    HandoffCapacityZero,
    /// The workload duration range is inverted.
    #[error("`min_task_ms` ({min_task_ms}) is greater than `max_task_ms` ({max_task_ms})")]
    InvalidTaskDurationRange { min_task_ms: u64, max_task_ms: u64 },
}
