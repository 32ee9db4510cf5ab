//! "Still working" notices for slow requests.
//!
//! [`with_progress`] awaits a unit of work and, if it is still running after
//! an interval, starts a notice future next to it. A notice that is still in
//! flight when the work finishes is awaited, so it never lands after
//! whatever the caller sends next.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Result of [`with_progress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracked<T> {
    /// Output of the work future.
    pub value: T,
    /// Whether the slow-work notice was started.
    pub notified: bool,
}

/// Awaits `work`, starting `on_slow()` if `work` outlives `interval`.
///
/// The notice future runs concurrently with `work`. If it has not finished
/// when `work` completes, it is awaited before returning. A zero `interval`
/// disables the notice.
pub async fn with_progress<W, T, S, N>(work: W, interval: Duration, on_slow: S) -> Tracked<T>
where
    W: Future<Output = T>,
    S: FnOnce() -> N,
    N: Future<Output = ()>,
{
    tokio::pin!(work);

    if interval.is_zero() {
        return Tracked {
            value: work.await,
            notified: false,
        };
    }

    tokio::select! {
        biased;
        value = &mut work => return Tracked { value, notified: false },
        _ = tokio::time::sleep(interval) => {}
    }

    debug!(interval_ms = interval.as_millis() as u64, "work still running, posting notice");
    let notice = on_slow();
    tokio::pin!(notice);
    let mut notice_done = false;

    let value = loop {
        tokio::select! {
            biased;
            value = &mut work => break value,
            _ = &mut notice, if !notice_done => notice_done = true,
        }
    };

    if !notice_done {
        debug!("work finished, waiting for notice to land");
        notice.await;
    }

    Tracked {
        value,
        notified: true,
    }
}
