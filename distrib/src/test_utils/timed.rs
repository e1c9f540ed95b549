use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Default upper bound for a whole test run.
///
/// Every scenario in the test suite settles in well under a second; this only catches hangs.
pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(10);

/// Awaits `future`, panicking if it does not resolve within [`DEFAULT_RUN_TIMEOUT`].
pub async fn within_default<F>(future: F) -> F::Output
where
    F: Future,
{
    within(DEFAULT_RUN_TIMEOUT, future).await
}

/// Awaits `future`, panicking if it does not resolve within `duration`.
///
/// # Panics
///
/// Panics when the duration elapses, so that a pipeline which never terminates fails the test
/// instead of hanging it.
pub async fn within<F>(duration: Duration, future: F) -> F::Output
where
    F: Future,
{
    match timeout(duration, future).await {
        Ok(output) => output,
        Err(_) => panic!("run did not terminate within {duration:?}"),
    }
}
