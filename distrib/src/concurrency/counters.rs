//! Counters shared between the dispatcher, the workers and the collector.
//!
//! All four values live behind a single mutex so that the collector's termination check sees a
//! consistent snapshot and the dispatcher advances the cursor and the sent count atomically.
//! The lock is never held across an `.await`.

use std::sync::{Arc, Mutex, MutexGuard};

/// Position of the dispatcher in the task sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Index of the next task to dispatch.
    Loading(usize),
    /// The collector asked the dispatcher to stop loading.
    Stopped,
}

/// Decision returned to the dispatcher for its next iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchDecision {
    /// Hand off the task at this index.
    Dispatch(usize),
    /// All tasks were handed off; supply is exhausted.
    Exhausted,
    /// Loading was stopped by the collector.
    Stopped,
}

/// Point-in-time view of the shared counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountersSnapshot {
    pub cursor: Cursor,
    /// Tasks handed off and still considered eligible to complete.
    pub sent: usize,
    /// Tasks accepted by the collector.
    pub received: usize,
    /// Target count, or zero once supply is exhausted.
    pub want: usize,
    /// Tasks given up by workers, because of a timeout or a panic.
    pub abandoned: usize,
    pub supply_exhausted: bool,
}

impl CountersSnapshot {
    /// Returns `true` once every eligible task arrived and the target (or supply) is met.
    pub fn is_drained(&self) -> bool {
        self.received >= self.want && self.received >= self.sent
    }

    /// Number of tasks that left the dispatcher.
    pub fn dispatched(&self) -> usize {
        self.sent + self.abandoned
    }
}

/// Cheaply cloneable handle to the shared counters of one pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineCounters {
    inner: Arc<Mutex<CountersSnapshot>>,
}

impl PipelineCounters {
    pub fn new(want: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(CountersSnapshot {
                cursor: Cursor::Loading(0),
                sent: 0,
                received: 0,
                want,
                abandoned: 0,
                supply_exhausted: false,
            })),
        }
    }

    /// Decides what the dispatcher does next given `total` tasks.
    ///
    /// On exhaustion `want` drops to zero, which tells the collector no more supply will come.
    pub fn next_dispatch(&self, total: usize) -> DispatchDecision {
        let mut inner = self.lock();

        match inner.cursor {
            Cursor::Stopped => DispatchDecision::Stopped,
            Cursor::Loading(index) if index >= total => {
                inner.want = 0;
                inner.supply_exhausted = true;
                DispatchDecision::Exhausted
            }
            Cursor::Loading(index) => DispatchDecision::Dispatch(index),
        }
    }

    /// Records the handoff of the task at `index`.
    ///
    /// Advances the cursor and increments `sent` in one critical section. Returns `false`
    /// without touching anything when loading was stopped, or the cursor moved, since the
    /// dispatcher read it; the caller must then not hand the task off.
    pub fn try_record_dispatch(&self, index: usize) -> bool {
        let mut inner = self.lock();

        if inner.cursor != Cursor::Loading(index) {
            return false;
        }

        inner.cursor = Cursor::Loading(index + 1);
        inner.sent += 1;

        true
    }

    /// Compensates a dispatch whose task will never reach the collector.
    ///
    /// Returns the remaining `sent` count.
    pub fn record_abandoned(&self) -> usize {
        let mut inner = self.lock();
        inner.sent = inner.sent.saturating_sub(1);
        inner.abandoned += 1;

        inner.sent
    }

    /// Counts one accepted result and returns the counters after the increment.
    pub fn record_received(&self) -> CountersSnapshot {
        let mut inner = self.lock();
        inner.received += 1;

        *inner
    }

    /// Asks the dispatcher to stop loading.
    ///
    /// Returns `true` if this call stopped it.
    pub fn stop_loading(&self) -> bool {
        let mut inner = self.lock();

        if inner.cursor == Cursor::Stopped {
            return false;
        }

        inner.cursor = Cursor::Stopped;
        true
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, CountersSnapshot> {
        // No code path panics while holding the lock, but a poisoned guard still holds
        // consistent integers.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_advances_cursor_and_sent_together() {
        let counters = PipelineCounters::new(3);

        assert_eq!(counters.next_dispatch(2), DispatchDecision::Dispatch(0));
        assert!(counters.try_record_dispatch(0));
        assert_eq!(counters.next_dispatch(2), DispatchDecision::Dispatch(1));
        assert!(counters.try_record_dispatch(1));

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.cursor, Cursor::Loading(2));
        assert_eq!(snapshot.sent, 2);
    }

    #[test]
    fn test_index_is_dispatched_at_most_once() {
        let counters = PipelineCounters::new(3);

        assert!(counters.try_record_dispatch(0));
        assert!(!counters.try_record_dispatch(0));
        assert_eq!(counters.snapshot().sent, 1);
    }

    #[test]
    fn test_exhaustion_zeroes_want() {
        let counters = PipelineCounters::new(10);

        assert!(counters.try_record_dispatch(0));
        assert_eq!(counters.next_dispatch(1), DispatchDecision::Exhausted);

        let snapshot = counters.snapshot();
        assert_eq!(snapshot.want, 0);
        assert!(snapshot.supply_exhausted);
    }

    #[test]
    fn test_stop_loading_blocks_further_dispatch() {
        let counters = PipelineCounters::new(1);

        assert_eq!(counters.next_dispatch(5), DispatchDecision::Dispatch(0));
        assert!(counters.stop_loading());
        assert!(!counters.stop_loading());

        assert!(!counters.try_record_dispatch(0));
        assert_eq!(counters.next_dispatch(5), DispatchDecision::Stopped);
        assert_eq!(counters.snapshot().sent, 0);
    }

    #[test]
    fn test_abandoned_tasks_unblock_drain() {
        let counters = PipelineCounters::new(1);
        assert!(counters.try_record_dispatch(0));
        assert!(counters.try_record_dispatch(1));

        counters.record_received();
        assert!(!counters.snapshot().is_drained());

        assert_eq!(counters.record_abandoned(), 1);
        let snapshot = counters.snapshot();
        assert!(snapshot.is_drained());
        assert_eq!(snapshot.dispatched(), 2);
    }

    #[test]
    fn test_sent_never_goes_negative() {
        let counters = PipelineCounters::new(1);
        assert_eq!(counters.record_abandoned(), 0);
        assert_eq!(counters.snapshot().sent, 0);
    }
}
