use distrib::Work;
use distrib_config::shared::WorkloadConfig;
use rand::Rng;
use std::thread;
use std::time::{Duration, Instant};

/// A task that blocks its thread for a fixed duration and records how long it actually took.
#[derive(Debug, Clone)]
pub struct SyntheticWork {
    duration: Duration,
    elapsed: Option<Duration>,
}

impl SyntheticWork {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            elapsed: None,
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }
}

impl Work for SyntheticWork {
    fn work(&mut self) {
        let started_at = Instant::now();
        thread::sleep(self.duration);
        self.elapsed = Some(started_at.elapsed());
    }
}

/// Draws a workload of `config.task_count` tasks with uniformly random durations.
pub fn build_workload<R: Rng>(config: &WorkloadConfig, rng: &mut R) -> Vec<SyntheticWork> {
    (0..config.task_count)
        .map(|_| {
            let millis = rng.gen_range(config.min_task_ms..=config.max_task_ms);
            SyntheticWork::new(Duration::from_millis(millis))
        })
        .collect()
}
