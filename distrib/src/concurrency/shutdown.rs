//! One-shot broadcast shutdown signal.
//!
//! The signal starts open and can be closed exactly once. Every blocking operation in the
//! pipeline races against [`ShutdownRx::wait_for_shutdown`], so closing the signal releases all
//! of them. Dropping the last [`ShutdownTx`] counts as closing it, which guarantees that no
//! receiver can wait forever once the pipeline that owns the transmitter is gone.

use std::sync::Arc;
use tokio::sync::watch;

/// Transmitter side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownTx(Arc<watch::Sender<bool>>);

impl ShutdownTx {
    /// Closes the signal.
    ///
    /// Returns `true` if this call performed the transition and `false` if the signal was
    /// already closed. Works whether or not any receiver exists.
    pub fn shutdown(&self) -> bool {
        self.0.send_if_modified(|closed| {
            if *closed {
                return false;
            }

            *closed = true;
            true
        })
    }

    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    /// Creates a new receiver observing this signal.
    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }
}

/// Receiver side of the shutdown signal.
#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

impl ShutdownRx {
    /// Non-blocking check of the signal state.
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow() || self.0.has_changed().is_err()
    }

    /// Resolves once the signal is closed or its transmitter dropped.
    ///
    /// Cancel safe: the future holds its own receiver clone, so it can be recreated in every
    /// iteration of a `tokio::select!` loop without missing a closure.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.0.clone();
        // An error means every transmitter is gone, which is treated as shutdown.
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

/// Creates a new open shutdown signal.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(Arc::new(tx)), ShutdownRx(rx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_shutdown_closes_exactly_once() {
        let (tx, rx) = create_shutdown_channel();
        assert!(!rx.is_shutdown());
        assert!(!tx.is_shutdown());

        assert!(tx.shutdown());
        assert!(!tx.shutdown());

        assert!(rx.is_shutdown());
        assert!(tx.is_shutdown());
    }

    #[tokio::test]
    async fn test_shutdown_wakes_every_waiter() {
        let (tx, rx) = create_shutdown_channel();

        let waiters = (0..4)
            .map(|_| {
                let rx = rx.clone();
                tokio::spawn(async move { rx.wait_for_shutdown().await })
            })
            .collect::<Vec<_>>();

        tx.shutdown();

        for waiter in waiters {
            timeout(Duration::from_secs(1), waiter)
                .await
                .expect("waiter should be released")
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_subscribe_after_shutdown_observes_closed_signal() {
        let (tx, _) = create_shutdown_channel();
        tx.shutdown();

        let late = tx.subscribe();
        assert!(late.is_shutdown());
        timeout(Duration::from_millis(100), late.wait_for_shutdown())
            .await
            .expect("closed signal should resolve immediately");
    }

    #[tokio::test]
    async fn test_dropped_transmitter_counts_as_shutdown() {
        let (tx, rx) = create_shutdown_channel();
        drop(tx);

        assert!(rx.is_shutdown());
        timeout(Duration::from_millis(100), rx.wait_for_shutdown())
            .await
            .expect("dropped transmitter should release waiters");
    }

    #[tokio::test]
    async fn test_open_signal_keeps_waiting() {
        let (_tx, rx) = create_shutdown_channel();
        let result = timeout(Duration::from_millis(30), rx.wait_for_shutdown()).await;
        assert!(result.is_err());
    }
}
