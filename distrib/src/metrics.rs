//! Metric names emitted through the `metrics` facade.
//!
//! The library never installs a recorder; without one these are no-ops.

/// Label for the worker slot that produced an event.
pub const WORKER_ID_LABEL: &str = "worker_id";

/// Label for the shutdown mode of a run.
pub const SHUTDOWN_MODE_LABEL: &str = "shutdown_mode";

/// Counter of tasks handed from the dispatcher to the worker pool.
pub const DISTRIB_TASKS_DISPATCHED_TOTAL: &str = "distrib_tasks_dispatched_total";

/// Counter of tasks accepted by the collector.
pub const DISTRIB_TASKS_COMPLETED_TOTAL: &str = "distrib_tasks_completed_total";

/// Counter of tasks abandoned because their deadline elapsed.
pub const DISTRIB_TASKS_TIMED_OUT_TOTAL: &str = "distrib_tasks_timed_out_total";

/// Counter of tasks abandoned because their execution panicked.
pub const DISTRIB_TASKS_PANICKED_TOTAL: &str = "distrib_tasks_panicked_total";

/// Histogram of whole-run durations in seconds.
pub const DISTRIB_RUN_DURATION_SECONDS: &str = "distrib_run_duration_seconds";
