use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use crate::types::Work;

/// Shared count of `work` executions, including those of abandoned tasks.
#[derive(Debug, Clone, Default)]
pub struct ExecutionCounter(Arc<AtomicUsize>);

impl ExecutionCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Work that returns immediately.
#[derive(Debug, Clone, Default)]
pub struct InstantWork {
    executions: ExecutionCounter,
}

impl InstantWork {
    pub fn new(executions: ExecutionCounter) -> Self {
        Self { executions }
    }
}

impl Work for InstantWork {
    fn work(&mut self) {
        self.executions.increment();
    }
}

/// Work that blocks its thread for a fixed duration.
#[derive(Debug, Clone)]
pub struct SleepingWork {
    duration: Duration,
    executions: ExecutionCounter,
    finished: bool,
}

impl SleepingWork {
    pub fn with_counter(duration: Duration, executions: ExecutionCounter) -> Self {
        Self {
            duration,
            executions,
            finished: false,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Returns `true` once `work` ran to completion on this value.
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Work for SleepingWork {
    fn work(&mut self) {
        thread::sleep(self.duration);
        self.finished = true;
        self.executions.increment();
    }
}

/// Work that always panics.
#[derive(Debug, Clone, Default)]
pub struct PanickingWork;

impl Work for PanickingWork {
    fn work(&mut self) {
        panic!("panicking work executed");
    }
}

/// Work whose behaviour is picked per item, for mixed workloads.
#[derive(Debug, Clone)]
pub enum MixedWork {
    Instant(InstantWork),
    Sleeping(SleepingWork),
    Panicking(PanickingWork),
}

impl Work for MixedWork {
    fn work(&mut self) {
        match self {
            MixedWork::Instant(work) => work.work(),
            MixedWork::Sleeping(work) => work.work(),
            MixedWork::Panicking(work) => work.work(),
        }
    }
}

/// Builds `count` instant items sharing one execution counter.
pub fn instant_workload(count: usize, executions: &ExecutionCounter) -> Vec<InstantWork> {
    (0..count)
        .map(|_| InstantWork::new(executions.clone()))
        .collect()
}

/// Builds `count` items that each sleep for `duration`.
pub fn sleeping_workload(
    count: usize,
    duration: Duration,
    executions: &ExecutionCounter,
) -> Vec<SleepingWork> {
    (0..count)
        .map(|_| SleepingWork::with_counter(duration, executions.clone()))
        .collect()
}
