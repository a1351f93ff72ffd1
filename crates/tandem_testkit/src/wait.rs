//! Helpers for awaiting `watch` channels in async tests.

use std::time::Duration;
use tokio::sync::watch;

/// Default deadline for `wait_until`.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(2);

/// Waits until `predicate` holds for the value of `rx` and returns a clone.
///
/// # Panics
///
/// Panics if the deadline passes or the sender is dropped first.
pub async fn wait_until<V, F>(rx: &mut watch::Receiver<V>, predicate: F) -> V
where
    V: Clone,
    F: FnMut(&V) -> bool,
{
    wait_until_within(rx, WAIT_TIMEOUT, predicate).await
}

/// Like `wait_until` with an explicit deadline.
///
/// # Panics
///
/// Panics if the deadline passes or the sender is dropped first.
pub async fn wait_until_within<V, F>(
    rx: &mut watch::Receiver<V>,
    deadline: Duration,
    predicate: F,
) -> V
where
    V: Clone,
    F: FnMut(&V) -> bool,
{
    let value = tokio::time::timeout(deadline, rx.wait_for(predicate))
        .await
        .expect("timed out waiting for channel value")
        .expect("channel closed while waiting");
    value.clone()
}

/// Yields to the runtime until `check` returns true.
///
/// For conditions that are not observable through a channel, such as a
/// store counter updated by a background write.
///
/// # Panics
///
/// Panics if the deadline passes.
pub async fn eventually<F: FnMut() -> bool>(mut check: F) {
    let started = tokio::time::Instant::now();
    while !check() {
        assert!(started.elapsed() < WAIT_TIMEOUT, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
