use metrics::histogram;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::concurrency::counters::{CountersSnapshot, PipelineCounters};
use crate::concurrency::shutdown::create_shutdown_channel;
use crate::config::DistribConfig;
use crate::distrib_error;
use crate::error::{DistribError, DistribResult, ErrorKind};
use crate::metrics::{DISTRIB_RUN_DURATION_SECONDS, SHUTDOWN_MODE_LABEL};
use crate::types::{Packet, Work};
use crate::workers::{Collector, CollectorExit, Dispatcher, WorkerPool};

/// Capacity of the channel between the workers and the collector.
const OUTBOUND_CAPACITY: usize = 1;

/// Outcome of a run, with the counters as the collector left them.
#[derive(Debug)]
pub struct DistribReport<W> {
    /// Completed packets in arrival order.
    pub packets: Vec<Packet<W>>,
    pub counters: CountersSnapshot,
    pub exit: CollectorExit,
    pub elapsed: Duration,
}

/// Reusable handle to run distributions with a validated configuration.
#[derive(Debug, Clone)]
pub struct Distributor {
    config: Arc<DistribConfig>,
}

impl Distributor {
    /// Validates `config` and builds a distributor from it.
    pub fn new(config: DistribConfig) -> DistribResult<Self> {
        config.validate()?;

        Ok(Self {
            config: Arc::new(config),
        })
    }

    pub fn config(&self) -> &DistribConfig {
        &self.config
    }

    /// Runs `items` through the pipeline and returns the completed packets in arrival order.
    ///
    /// Timed-out and panicked tasks are left out of the result; they are never an error.
    pub async fn run<W, I>(&self, items: I) -> DistribResult<Vec<Packet<W>>>
    where
        W: Work,
        I: IntoIterator<Item = W>,
    {
        let report = self.run_with_report(items).await?;

        Ok(report.packets)
    }

    /// Same as [`Distributor::run`], but also returns the final counters and timing.
    pub async fn run_with_report<W, I>(&self, items: I) -> DistribResult<DistribReport<W>>
    where
        W: Work,
        I: IntoIterator<Item = W>,
    {
        let started_at = Instant::now();

        let packets = items
            .into_iter()
            .enumerate()
            .map(|(task_id, work)| Packet::new(task_id, work))
            .collect::<Vec<_>>();

        info!(
            total = packets.len(),
            worker_count = self.config.worker_count,
            want = self.config.want,
            shutdown_mode = %self.config.shutdown_mode,
            "starting distribution run"
        );

        // We create the counters shared by all stages, seeded with the target count.
        let counters = PipelineCounters::new(self.config.want);

        // The collector owns the transmitter; every other stage only listens.
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();

        let (handoff_tx, handoff_rx) = mpsc::channel(self.config.handoff_capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

        let pool = WorkerPool::start(
            &self.config,
            handoff_rx,
            outbound_tx,
            counters.clone(),
            shutdown_rx.clone(),
        );

        let dispatcher =
            Dispatcher::new(packets, counters.clone(), handoff_tx, shutdown_rx).start();

        let (packets, exit) = Collector::new(
            (*self.config).clone(),
            counters.clone(),
            outbound_rx,
            shutdown_tx,
            started_at,
        )
        .collect()
        .await;

        // The collector closed the shutdown signal, so both stages exit without waiting on
        // tasks that are still running on blocking threads.
        let mut errors = Vec::new();
        if let Err(err) = dispatcher.wait().await {
            errors.push(err);
        }
        if let Err(err) = pool.wait_all().await {
            errors.push(err);
        }
        if !errors.is_empty() {
            let err = DistribError::from(errors);
            error!(error = %err, "pipeline stages failed, returning collected results");
        }

        let elapsed = started_at.elapsed();
        histogram!(
            DISTRIB_RUN_DURATION_SECONDS,
            SHUTDOWN_MODE_LABEL => self.config.shutdown_mode.as_str()
        )
        .record(elapsed.as_secs_f64());

        Ok(DistribReport {
            packets,
            counters: counters.snapshot(),
            exit,
            elapsed,
        })
    }

    /// Runs the pipeline to completion from synchronous code.
    ///
    /// Builds a dedicated current-thread runtime. Must not be called from within a runtime.
    pub fn run_blocking<W, I>(&self, items: I) -> DistribResult<Vec<Packet<W>>>
    where
        W: Work,
        I: IntoIterator<Item = W>,
    {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(distrib_error!(
                ErrorKind::InvalidState,
                "Blocking run started inside an async runtime",
                "use `Distributor::run` instead"
            ));
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|err| {
                distrib_error!(
                    ErrorKind::RuntimeError,
                    "Failed to build the runtime",
                    source: err
                )
            })?;

        let result = runtime.block_on(self.run(items));

        // Dropping the runtime would wait for abandoned tasks still running on blocking threads.
        runtime.shutdown_background();

        result
    }
}

/// Runs `items` through a pipeline configured by `config`.
///
/// Returns an error only when `config` is invalid.
pub async fn distribute<W, I>(items: I, config: &DistribConfig) -> DistribResult<Vec<Packet<W>>>
where
    W: Work,
    I: IntoIterator<Item = W>,
{
    Distributor::new(config.clone())?.run(items).await
}
