use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::concurrency::counters::PipelineCounters;
use crate::concurrency::shutdown::ShutdownRx;
use crate::metrics::{
    DISTRIB_TASKS_PANICKED_TOTAL, DISTRIB_TASKS_TIMED_OUT_TOTAL, WORKER_ID_LABEL,
};
use crate::types::{Packet, TaskId, Work, WorkerId};

/// Receiving end of the handoff channel, shared by every worker of a pool.
pub type SharedHandoffRx<W> = Arc<Mutex<mpsc::Receiver<Packet<W>>>>;

/// Result of racing one task against its deadline.
#[derive(Debug)]
enum Execution<W> {
    Completed(Packet<W>),
    TimedOut(TaskId),
    Panicked(TaskId),
    Shutdown,
}

/// A single worker slot of the pool.
///
/// Takes packets from the shared handoff channel, runs each one on a blocking thread and
/// forwards it to the collector if it finishes before `task_timeout`. Late tasks are abandoned:
/// their thread keeps running to completion, but the result is dropped.
#[derive(Debug)]
pub struct TaskExecutor<W> {
    worker_id: WorkerId,
    task_timeout: Duration,
    handoff_rx: SharedHandoffRx<W>,
    outbound_tx: mpsc::Sender<Packet<W>>,
    counters: PipelineCounters,
    shutdown_rx: ShutdownRx,
}

impl<W> TaskExecutor<W>
where
    W: Work,
{
    pub fn new(
        worker_id: WorkerId,
        task_timeout: Duration,
        handoff_rx: SharedHandoffRx<W>,
        outbound_tx: mpsc::Sender<Packet<W>>,
        counters: PipelineCounters,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            worker_id,
            task_timeout,
            handoff_rx,
            outbound_tx,
            counters,
            shutdown_rx,
        }
    }

    /// Runs the worker loop until shutdown or until the handoff channel is closed and drained.
    ///
    /// Returns the worker id so the pool can report which slot exited.
    pub async fn run(self) -> WorkerId {
        let worker_label = self.worker_id.to_string();

        loop {
            let packet = tokio::select! {
                biased;

                _ = self.shutdown_rx.wait_for_shutdown() => {
                    debug!("shutdown received while idle");
                    break;
                }
                packet = Self::receive(&self.handoff_rx) => match packet {
                    Some(packet) => packet,
                    None => {
                        debug!("handoff channel closed and drained");
                        break;
                    }
                },
            };

            match self.execute(packet).await {
                Execution::Completed(packet) => {
                    if !self.forward(packet).await {
                        break;
                    }
                }
                Execution::TimedOut(task_id) => {
                    let sent = self.counters.record_abandoned();
                    counter!(DISTRIB_TASKS_TIMED_OUT_TOTAL, WORKER_ID_LABEL => worker_label.clone())
                        .increment(1);
                    warn!(
                        task_id,
                        timeout_ms = self.task_timeout.as_millis() as u64,
                        sent,
                        "task timed out, abandoning it"
                    );
                }
                Execution::Panicked(task_id) => {
                    let sent = self.counters.record_abandoned();
                    counter!(DISTRIB_TASKS_PANICKED_TOTAL, WORKER_ID_LABEL => worker_label.clone())
                        .increment(1);
                    error!(task_id, sent, "task panicked, abandoning it");
                }
                Execution::Shutdown => {
                    debug!("shutdown received while a task was running");
                    break;
                }
            }
        }

        debug!("worker exited");
        self.worker_id
    }

    async fn receive(handoff_rx: &Mutex<mpsc::Receiver<Packet<W>>>) -> Option<Packet<W>> {
        handoff_rx.lock().await.recv().await
    }

    async fn execute(&self, mut packet: Packet<W>) -> Execution<W> {
        let task_id = packet.task_id();
        let worker_id = self.worker_id;
        let (result_tx, result_rx) = oneshot::channel();

        // The handle is dropped on purpose: blocking work cannot be cancelled, so a task that
        // misses its deadline runs detached and its result is discarded below.
        drop(tokio::task::spawn_blocking(move || {
            packet.assign_worker(worker_id);
            packet.execute();

            if let Err(packet) = result_tx.send(packet) {
                debug!(%packet, "discarding result of an abandoned task");
            }
        }));

        tokio::select! {
            biased;

            _ = self.shutdown_rx.wait_for_shutdown() => Execution::Shutdown,
            result = result_rx => match result {
                Ok(packet) => Execution::Completed(packet),
                // The sender is only dropped without sending if the work panicked.
                Err(_) => Execution::Panicked(task_id),
            },
            _ = tokio::time::sleep(self.task_timeout) => Execution::TimedOut(task_id),
        }
    }

    /// Hands a completed packet to the collector. Returns `false` if the worker must exit.
    async fn forward(&self, packet: Packet<W>) -> bool {
        let task_id = packet.task_id();

        tokio::select! {
            biased;

            _ = self.shutdown_rx.wait_for_shutdown() => {
                debug!(task_id, "shutdown received while forwarding, dropping result");
                false
            }
            result = self.outbound_tx.send(packet) => match result {
                Ok(()) => true,
                Err(_) => {
                    debug!(task_id, "outbound channel closed, dropping result");
                    false
                }
            },
        }
    }
}
