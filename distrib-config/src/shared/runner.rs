use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

use crate::shared::{DistribConfig, ValidationError};

/// Synthetic workload executed by the runner binary.
///
/// Each task sleeps for a duration drawn uniformly from `min_task_ms..=max_task_ms`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct WorkloadConfig {
    #[serde(default = "default_task_count")]
    pub task_count: usize,
    #[serde(default)]
    pub min_task_ms: u64,
    #[serde(default)]
    pub max_task_ms: u64,
}

impl WorkloadConfig {
    pub const DEFAULT_TASK_COUNT: usize = 20;

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.min_task_ms > self.max_task_ms {
            return Err(ValidationError::InvalidTaskDurationRange {
                min_task_ms: self.min_task_ms,
                max_task_ms: self.max_task_ms,
            });
        }

        Ok(())
    }

    pub fn min_task_duration(&self) -> Duration {
        Duration::from_millis(self.min_task_ms)
    }

    pub fn max_task_duration(&self) -> Duration {
        Duration::from_millis(self.max_task_ms)
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            task_count: default_task_count(),
            min_task_ms: 0,
            max_task_ms: 0,
        }
    }
}

fn default_task_count() -> usize {
    WorkloadConfig::DEFAULT_TASK_COUNT
}

/// Top-level configuration of the runner binary.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RunnerConfig {
    #[serde(default)]
    pub distrib: DistribConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
    /// Address of the Prometheus scrape endpoint. Metrics are disabled when unset.
    #[serde(default)]
    pub metrics_listen_addr: Option<SocketAddr>,
}

impl RunnerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.distrib.validate()?;
        self.workload.validate()
    }
}
