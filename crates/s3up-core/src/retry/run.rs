//! Backoff wait that gives way to cancellation.

use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Sleeps for `delay` unless `cancel` fires first.
/// Returns `true` if the full delay elapsed, `false` if cancelled.
pub async fn wait_backoff(delay: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if delay.is_zero() {
        return true;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
