//! # Rate Limiter
//!
//! Serializes dispatch of asynchronous operations so no more than a
//! configured number start per second, preserving arrival order. Callers
//! block in [`RateLimiter::acquire`] until their turn; pacing governs start
//! time only, so a failed operation still counts as dispatched.
//!
//! The limiter is a two-state machine: `Idle` (queue empty) and `Draining`
//! (a spawned task walks the queue, sleeping out the remainder of the
//! minimum inter-dispatch interval before resuming each waiter). There is no
//! background polling while idle.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::{debug, trace};

struct LimiterState {
    queue: VecDeque<oneshot::Sender<()>>,
    draining: bool,
    last_dispatch: Option<Instant>,
}

struct Inner {
    name: String,
    min_interval: Duration,
    state: Mutex<LimiterState>,
}

/// FIFO pacing limiter, cheaply cloneable so concurrent callers share one
/// dispatch schedule.
///
/// # Example
/// ```rust,no_run
/// use studyforge_core::resilience::rate_limiter::RateLimiter;
///
/// # async fn example() {
/// let limiter = RateLimiter::new("provider", 2); // 2 dispatches/sec
/// limiter.acquire().await;
/// // proceed with the provider call
/// # }
/// ```
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

impl RateLimiter {
    /// Create a limiter allowing `calls_per_second` dispatches per second.
    ///
    /// # Panics
    /// Panics if `calls_per_second` is zero.
    pub fn new(name: impl Into<String>, calls_per_second: u32) -> Self {
        assert!(calls_per_second > 0, "calls_per_second must be > 0");
        // Nanosecond-precision division; whole-millisecond division would
        // truncate and undercut the floor for rates that don't divide 1000
        Self::with_min_interval(name, Duration::from_secs(1) / calls_per_second)
    }

    /// Create a limiter with an explicit minimum inter-dispatch interval.
    pub fn with_min_interval(name: impl Into<String>, min_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                min_interval,
                state: Mutex::new(LimiterState {
                    queue: VecDeque::new(),
                    draining: false,
                    last_dispatch: None,
                }),
            }),
        }
    }

    /// The enforced floor between consecutive dispatches.
    pub fn min_interval(&self) -> Duration {
        self.inner.min_interval
    }

    /// Number of callers currently waiting for dispatch.
    pub fn queued(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    /// Resolve once it is this caller's turn to proceed.
    ///
    /// Dispatch order is strictly the order `acquire` was called in. If the
    /// limiter has been idle longer than the minimum interval, the caller
    /// proceeds with negligible delay.
    pub async fn acquire(&self) {
        let (tx, rx) = oneshot::channel();
        let start_drain = {
            let mut state = self.inner.state.lock();
            state.queue.push_back(tx);
            if state.draining {
                false
            } else {
                state.draining = true;
                true
            }
        };

        if start_drain {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(drain(inner));
        }

        // The drain task resolves every queued sender before exiting, so a
        // recv error can only mean the runtime is tearing down.
        let _ = rx.await;
    }

    /// Acquire a dispatch slot, then run `operation`.
    ///
    /// The operation's result is returned unchanged; failures do not affect
    /// pacing state.
    pub async fn call<T, F, Fut>(&self, operation: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        self.acquire().await;
        operation().await
    }
}

/// Walk the queue, pacing each dispatch, until it empties.
async fn drain(inner: Arc<Inner>) {
    loop {
        let waiter = {
            let mut state = inner.state.lock();
            match state.queue.pop_front() {
                Some(tx) => tx,
                None => {
                    // Transition back to Idle under the same lock that
                    // guards enqueue, so no waiter can be stranded.
                    state.draining = false;
                    debug!(limiter = %inner.name, "Rate limiter drained, going idle");
                    return;
                }
            }
        };

        let wait = {
            let state = inner.state.lock();
            state
                .last_dispatch
                .and_then(|last| inner.min_interval.checked_sub(last.elapsed()))
        };
        if let Some(remainder) = wait {
            trace!(
                limiter = %inner.name,
                wait_ms = remainder.as_millis() as u64,
                "Pacing next dispatch"
            );
            tokio::time::sleep(remainder).await;
        }

        inner.state.lock().last_dispatch = Some(Instant::now());
        // Receiver dropped means the caller's future was cancelled; the slot
        // is spent either way.
        let _ = waiter.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;

    #[tokio::test]
    async fn burst_is_paced_and_fifo() {
        let limiter = RateLimiter::with_min_interval("test", Duration::from_millis(100));
        let order = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for i in 0..3u32 {
            let limiter = limiter.clone();
            let order = Arc::clone(&order);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                order.lock().push((i, Instant::now()));
            }));
            // Stagger spawns slightly so arrival order is deterministic
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let resolved = order.lock().clone();
        assert_eq!(resolved.len(), 3);
        let ids: Vec<u32> = resolved.iter().map(|(i, _)| *i).collect();
        assert_eq!(ids, vec![0, 1, 2]);

        // Consecutive dispatches spaced by at least the interval, with a
        // small allowance for wakeup scheduling skew
        for pair in resolved.windows(2) {
            let gap = pair[1].1.duration_since(pair[0].1);
            assert!(gap >= Duration::from_millis(80), "gap was {gap:?}");
        }
    }

    #[tokio::test]
    async fn idle_limiter_dispatches_immediately() {
        let limiter = RateLimiter::with_min_interval("test", Duration::from_millis(200));

        // Consume one slot, then let the limiter go fully idle
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(limiter.queued(), 0);

        let started = Instant::now();
        limiter.acquire().await;
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn failed_operation_still_counts_as_dispatched() {
        let limiter = RateLimiter::with_min_interval("test", Duration::from_millis(100));

        let failed: Result<(), _> = limiter
            .call(|| async { Err(ApiError::Server { status: 500 }) })
            .await;
        assert!(failed.is_err());

        // The failure consumed a slot: the next acquire is still paced
        let started = Instant::now();
        limiter.acquire().await;
        assert!(started.elapsed() >= Duration::from_millis(80));
    }

    #[tokio::test]
    async fn interval_does_not_truncate_for_uneven_rates() {
        let limiter = RateLimiter::new("test", 3);
        assert_eq!(limiter.min_interval(), Duration::from_secs(1) / 3);
        assert!(limiter.min_interval() > Duration::from_millis(333));

        let even = RateLimiter::new("test", 2);
        assert_eq!(even.min_interval(), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn call_returns_operation_result_unchanged() {
        let limiter = RateLimiter::new("test", 100);
        let value = limiter.call(|| async { 7 }).await;
        assert_eq!(value, 7);
    }
}
