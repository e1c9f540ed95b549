use std::sync::Arc;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{Instrument, debug, error};

use crate::concurrency::counters::PipelineCounters;
use crate::concurrency::shutdown::ShutdownRx;
use crate::config::DistribConfig;
use crate::distrib_error;
use crate::error::{DistribResult, ErrorKind};
use crate::types::{Packet, Work, WorkerId};
use crate::workers::executor::TaskExecutor;

/// Fixed-size pool of [`TaskExecutor`] workers sharing one handoff channel.
///
/// Workers are identical and interchangeable; a packet is taken by whichever idle worker wins
/// the receive. The pool lives until every worker exited, either because of shutdown or
/// because the dispatcher closed the handoff channel and it drained.
#[derive(Debug)]
pub struct WorkerPool {
    join_set: JoinSet<WorkerId>,
}

impl WorkerPool {
    /// Spawns `config.worker_count` workers with ids `0..worker_count`.
    pub fn start<W>(
        config: &DistribConfig,
        handoff_rx: mpsc::Receiver<Packet<W>>,
        outbound_tx: mpsc::Sender<Packet<W>>,
        counters: PipelineCounters,
        shutdown_rx: ShutdownRx,
    ) -> Self
    where
        W: Work,
    {
        let handoff_rx = Arc::new(Mutex::new(handoff_rx));
        let task_timeout = config.task_timeout();
        let mut join_set = JoinSet::new();

        for worker_id in 0..config.worker_count {
            let executor = TaskExecutor::new(
                worker_id,
                task_timeout,
                handoff_rx.clone(),
                outbound_tx.clone(),
                counters.clone(),
                shutdown_rx.clone(),
            );

            let span = tracing::info_span!("worker", worker_id);
            join_set.spawn(executor.run().instrument(span));
        }

        debug!(worker_count = config.worker_count, "worker pool started");

        Self { join_set }
    }

    /// Waits for every worker to exit.
    ///
    /// Panicked workers are collected and returned together; cancelled ones are ignored.
    pub async fn wait_all(mut self) -> DistribResult<()> {
        let mut errors = Vec::new();

        while let Some(result) = self.join_set.join_next().await {
            match result {
                Ok(worker_id) => {
                    debug!(worker_id, "worker finished");
                }
                Err(join_err) => {
                    if join_err.is_cancelled() {
                        debug!("worker task was cancelled");
                    } else {
                        error!(error = %join_err, "worker task panicked");
                        errors.push(distrib_error!(
                            ErrorKind::WorkerPanic,
                            "Worker panicked",
                            join_err
                        ));
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}
