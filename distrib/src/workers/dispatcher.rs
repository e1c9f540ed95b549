use metrics::counter;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info};

use crate::concurrency::counters::{DispatchDecision, PipelineCounters};
use crate::concurrency::shutdown::ShutdownRx;
use crate::distrib_error;
use crate::error::{DistribResult, ErrorKind};
use crate::metrics::DISTRIB_TASKS_DISPATCHED_TOTAL;
use crate::types::{Packet, Work};

/// Handle to a running [`Dispatcher`].
#[derive(Debug)]
pub struct DispatcherHandle {
    handle: Option<JoinHandle<()>>,
}

impl DispatcherHandle {
    /// Waits for the dispatcher task to exit.
    pub async fn wait(mut self) -> DistribResult<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };

        handle.await.map_err(|err| {
            if err.is_cancelled() {
                distrib_error!(ErrorKind::InvalidState, "Dispatcher was cancelled", err)
            } else {
                distrib_error!(ErrorKind::WorkerPanic, "Dispatcher panicked", err)
            }
        })
    }
}

/// First stage of the pipeline: feeds packets to the worker pool in index order.
///
/// The dispatcher exits when every packet was handed off, when the collector stops loading,
/// when the shutdown signal closes, or when the worker pool dropped the handoff channel.
/// Exiting drops the handoff sender, which lets idle workers finish once the channel drains.
#[derive(Debug)]
pub struct Dispatcher<W> {
    packets: Vec<Packet<W>>,
    counters: PipelineCounters,
    handoff_tx: mpsc::Sender<Packet<W>>,
    shutdown_rx: ShutdownRx,
}

impl<W> Dispatcher<W>
where
    W: Work,
{
    /// Creates a dispatcher over `packets`, which must be ordered by task id starting at zero.
    pub fn new(
        packets: Vec<Packet<W>>,
        counters: PipelineCounters,
        handoff_tx: mpsc::Sender<Packet<W>>,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            packets,
            counters,
            handoff_tx,
            shutdown_rx,
        }
    }

    /// Spawns the dispatcher on the current runtime.
    pub fn start(self) -> DispatcherHandle {
        let span = tracing::info_span!("dispatcher", total = self.packets.len());
        let handle = tokio::spawn(self.run().instrument(span));

        DispatcherHandle {
            handle: Some(handle),
        }
    }

    async fn run(self) {
        let total = self.packets.len();
        let mut packets = self.packets.into_iter();

        loop {
            let index = match self.counters.next_dispatch(total) {
                DispatchDecision::Dispatch(index) => index,
                DispatchDecision::Exhausted => {
                    info!(total, "input packets exhausted");
                    return;
                }
                DispatchDecision::Stopped => {
                    info!("loading stopped by the collector");
                    return;
                }
            };

            // Only the dispatcher advances the cursor, so the iterator stays in lockstep.
            let Some(packet) = packets.next() else {
                return;
            };

            // A permit is reserved before counting the dispatch, so a worker can never
            // observe (and compensate) a packet whose dispatch is not yet counted.
            let permit = tokio::select! {
                biased;

                _ = self.shutdown_rx.wait_for_shutdown() => {
                    debug!(task_id = index, "shutdown while waiting to hand off packet");
                    return;
                }
                permit = self.handoff_tx.reserve() => match permit {
                    Ok(permit) => permit,
                    Err(_) => {
                        debug!("handoff channel closed, stopping dispatch");
                        return;
                    }
                },
            };

            if !self.counters.try_record_dispatch(index) {
                info!("loading stopped by the collector");
                return;
            }

            counter!(DISTRIB_TASKS_DISPATCHED_TOTAL).increment(1);
            permit.send(packet);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::concurrency::counters::Cursor;
    use crate::concurrency::shutdown::create_shutdown_channel;
    use std::time::Duration;
    use tokio::time::timeout;

    fn packets(count: usize) -> Vec<Packet<fn()>> {
        (0..count).map(|id| Packet::new(id, (|| {}) as fn())).collect()
    }

    #[tokio::test]
    async fn test_dispatches_in_strictly_increasing_order() {
        let counters = PipelineCounters::new(10);
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let (handoff_tx, mut handoff_rx) = mpsc::channel(1);

        let handle = Dispatcher::new(packets(8), counters.clone(), handoff_tx, shutdown_rx).start();

        let mut ids = Vec::new();
        while let Some(packet) = handoff_rx.recv().await {
            ids.push(packet.task_id());
        }

        handle.wait().await.unwrap();
        assert_eq!(ids, (0..8).collect::<Vec<_>>());

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.sent, 8);
        assert_eq!(snapshot.want, 0);
        assert!(snapshot.supply_exhausted);
        assert!(!shutdown_tx.is_shutdown());
    }

    #[tokio::test]
    async fn test_stops_when_collector_stops_loading() {
        let counters = PipelineCounters::new(2);
        let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let (handoff_tx, mut handoff_rx) = mpsc::channel(1);

        let handle = Dispatcher::new(packets(100), counters.clone(), handoff_tx, shutdown_rx).start();

        let first = handoff_rx.recv().await.unwrap();
        assert_eq!(first.task_id(), 0);
        counters.stop_loading();

        // At most one more packet may have been handed off before the stop was observed.
        let mut rest = Vec::new();
        while let Some(packet) = handoff_rx.recv().await {
            rest.push(packet.task_id());
        }

        timeout(Duration::from_secs(1), handle.wait())
            .await
            .expect("dispatcher should exit")
            .unwrap();

        assert!(rest.len() <= 1);
        let snapshot = counters.snapshot();
        assert_eq!(snapshot.cursor, Cursor::Stopped);
        assert_eq!(snapshot.sent, 1 + rest.len());
        assert!(!snapshot.supply_exhausted);
    }

    #[tokio::test]
    async fn test_blocked_handoff_is_released_by_shutdown() {
        let counters = PipelineCounters::new(10);
        let (shutdown_tx, shutdown_rx) = create_shutdown_channel();
        // Nobody receives, so the second handoff blocks forever without shutdown.
        let (handoff_tx, _handoff_rx) = mpsc::channel(1);

        let handle = Dispatcher::new(packets(5), counters.clone(), handoff_tx, shutdown_rx).start();

        tokio::time::sleep(Duration::from_millis(20)).await;
        shutdown_tx.shutdown();

        timeout(Duration::from_secs(1), handle.wait())
            .await
            .expect("dispatcher should exit on shutdown")
            .unwrap();

        assert_eq!(counters.snapshot().sent, 1);
    }

    #[tokio::test]
    async fn test_empty_input_exhausts_immediately() {
        let counters = PipelineCounters::new(3);
        let (_shutdown_tx, shutdown_rx) = create_shutdown_channel();
        let (handoff_tx, mut handoff_rx) = mpsc::channel(1);

        Dispatcher::new(packets(0), counters.clone(), handoff_tx, shutdown_rx)
            .start()
            .wait()
            .await
            .unwrap();

        assert!(handoff_rx.recv().await.is_none());
        assert!(counters.snapshot().supply_exhausted);
    }
}
