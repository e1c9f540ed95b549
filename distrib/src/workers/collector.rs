use metrics::counter;
use std::time::Instant;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::concurrency::counters::{CountersSnapshot, PipelineCounters};
use crate::concurrency::shutdown::ShutdownTx;
use crate::config::DistribConfig;
use crate::metrics::{DISTRIB_TASKS_COMPLETED_TOTAL, WORKER_ID_LABEL};
use crate::types::{Packet, Work};

/// Reason the collector loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorExit {
    /// Every eligible task arrived or was abandoned.
    Drained,
    /// Abandon mode reached the configured target.
    TargetReached,
    /// All workers exited and the outbound channel closed.
    OutboundClosed,
    /// The shutdown signal closed from elsewhere.
    Shutdown,
}

impl CollectorExit {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectorExit::Drained => "drained",
            CollectorExit::TargetReached => "target_reached",
            CollectorExit::OutboundClosed => "outbound_closed",
            CollectorExit::Shutdown => "shutdown",
        }
    }
}

/// Final stage of the pipeline. Runs in the caller's task.
///
/// Accumulates completed packets in arrival order, decides when the run is over and closes the
/// shutdown signal on the way out.
#[derive(Debug)]
pub struct Collector<W> {
    config: DistribConfig,
    counters: PipelineCounters,
    outbound_rx: mpsc::Receiver<Packet<W>>,
    shutdown_tx: ShutdownTx,
    started_at: Instant,
}

impl<W> Collector<W>
where
    W: Work,
{
    pub fn new(
        config: DistribConfig,
        counters: PipelineCounters,
        outbound_rx: mpsc::Receiver<Packet<W>>,
        shutdown_tx: ShutdownTx,
        started_at: Instant,
    ) -> Self {
        Self {
            config,
            counters,
            outbound_rx,
            shutdown_tx,
            started_at,
        }
    }

    /// Collects results until the run terminates.
    ///
    /// The shutdown signal is always closed when this returns, so every other stage is
    /// released even if it is blocked on a channel.
    pub async fn collect(mut self) -> (Vec<Packet<W>>, CollectorExit) {
        let mut results = Vec::new();

        let exit = if self.target_reached(0) {
            // Any arrival would overshoot a zero target.
            self.counters.stop_loading();
            CollectorExit::TargetReached
        } else {
            self.receive_until_done(&mut results).await
        };

        self.shutdown_tx.shutdown();

        if self.config.trailing_pause {
            tokio::time::sleep(DistribConfig::TRAILING_PAUSE).await;
        }

        let snapshot = self.counters.snapshot();
        info!(
            exit = exit.as_str(),
            shutdown_mode = %self.config.shutdown_mode,
            received = snapshot.received,
            sent = snapshot.sent,
            timed_out = snapshot.abandoned,
            elapsed_ms = self.started_at.elapsed().as_millis() as u64,
            "collection finished"
        );

        (results, exit)
    }

    async fn receive_until_done(&mut self, results: &mut Vec<Packet<W>>) -> CollectorExit {
        let shutdown_rx = self.shutdown_tx.subscribe();
        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.wait_for_shutdown() => {
                    break CollectorExit::Shutdown;
                }
                packet = self.outbound_rx.recv() => {
                    let Some(packet) = packet else {
                        break CollectorExit::OutboundClosed;
                    };

                    if let Some(exit) = self.accept(packet, results) {
                        break exit;
                    }
                }
                _ = ticker.tick() => {
                    let snapshot = self.counters.snapshot();
                    if self.is_finished(&snapshot) {
                        break CollectorExit::Drained;
                    }
                }
            }
        }
    }

    /// Records one arrival. Returns an exit when the run must end right away.
    fn accept(
        &self,
        packet: Packet<W>,
        results: &mut Vec<Packet<W>>,
    ) -> Option<CollectorExit> {
        let worker_label = packet
            .worker_id()
            .map(|worker_id| worker_id.to_string())
            .unwrap_or_default();
        counter!(DISTRIB_TASKS_COMPLETED_TOTAL, WORKER_ID_LABEL => worker_label).increment(1);

        let snapshot = self.counters.record_received();
        debug!(
            received = snapshot.received,
            want = snapshot.want,
            sent = snapshot.sent,
            %packet,
            "result received"
        );
        results.push(packet);

        if snapshot.received >= snapshot.want
            && self.counters.stop_loading()
            && !snapshot.supply_exhausted
        {
            info!(received = snapshot.received, "enough results, stopped loading");
        }

        if self.target_reached(snapshot.received) {
            return Some(CollectorExit::TargetReached);
        }

        None
    }

    /// Abandon mode ends as soon as the configured target is met.
    fn target_reached(&self, received: usize) -> bool {
        !self.config.collects_remainder() && received >= self.config.want
    }

    fn is_finished(&self, snapshot: &CountersSnapshot) -> bool {
        (self.config.collects_remainder() || snapshot.supply_exhausted) && snapshot.is_drained()
    }
}
