use crate::config::{DistribConfig, ShutdownMode};

/// Builder for test configurations.
///
/// Starts from [`DistribConfig::default`] so tests only spell out what they exercise.
///
/// # Examples
///
/// ```ignore
/// let config = TestConfigBuilder::new()
///     .with_workers(1)
///     .with_want(3)
///     .with_shutdown_mode(ShutdownMode::Abandon)
///     .build();
/// ```
#[derive(Debug, Clone, Default)]
pub struct TestConfigBuilder {
    config: DistribConfig,
}

impl TestConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.config.worker_count = worker_count;
        self
    }

    pub fn with_want(mut self, want: usize) -> Self {
        self.config.want = want;
        self
    }

    pub fn with_task_timeout_ms(mut self, task_timeout_ms: u64) -> Self {
        self.config.task_timeout_ms = task_timeout_ms;
        self
    }

    pub fn with_shutdown_mode(mut self, shutdown_mode: ShutdownMode) -> Self {
        self.config.shutdown_mode = shutdown_mode;
        self
    }

    pub fn with_trailing_pause(mut self, trailing_pause: bool) -> Self {
        self.config.trailing_pause = trailing_pause;
        self
    }

    pub fn with_handoff_capacity(mut self, handoff_capacity: usize) -> Self {
        self.config.handoff_capacity = handoff_capacity;
        self
    }

    pub fn build(self) -> DistribConfig {
        self.config
    }
}
