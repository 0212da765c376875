//! Global request pacing
//!
//! Every outbound request takes a slot from a single shared [`Pacer`]. The
//! slot is granted only once `min_delay` has passed since the previous
//! request completed, and the completion time is recorded when the slot is
//! dropped, so failed requests consume their place in the schedule too.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct PaceState {
    min_delay: Duration,
    last_request: Option<Instant>,
}

/// Shared pacing clock. Clones share the same state.
#[derive(Debug, Clone)]
pub struct Pacer {
    state: Arc<Mutex<PaceState>>,
}

/// Exclusive permission to perform one request
///
/// Holding a slot blocks every other request; dropping it stamps the
/// completion time.
pub struct PaceSlot<'a> {
    guard: MutexGuard<'a, PaceState>,
}

impl Drop for PaceSlot<'_> {
    fn drop(&mut self) {
        self.guard.last_request = Some(Instant::now());
    }
}

impl Pacer {
    pub fn new(min_delay: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(PaceState {
                min_delay,
                last_request: None,
            })),
        }
    }

    /// Current minimum interval between requests
    pub async fn min_delay(&self) -> Duration {
        self.state.lock().await.min_delay
    }

    /// Raises the minimum interval; a shorter value is ignored
    pub async fn raise_min_delay(&self, delay: Duration) {
        let mut state = self.state.lock().await;
        if delay > state.min_delay {
            tracing::info!(
                "Raising crawl delay from {:?} to {:?}",
                state.min_delay,
                delay
            );
            state.min_delay = delay;
        }
    }

    /// Overrides the minimum interval unconditionally
    pub async fn set_min_delay(&self, delay: Duration) {
        self.state.lock().await.min_delay = delay;
    }

    /// Waits until a request may be sent and returns the slot for it
    ///
    /// Returns None if `cancel` fires while waiting.
    pub async fn acquire(&self, cancel: &CancellationToken) -> Option<PaceSlot<'_>> {
        let guard = tokio::select! {
            biased;
            _ = cancel.cancelled() => return None,
            guard = self.state.lock() => guard,
        };

        if let Some(wait) = time_until_ready(&guard, Instant::now()) {
            tracing::trace!("Pacing: sleeping {:?} before next request", wait);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = tokio::time::sleep(wait) => {}
            }
        }

        Some(PaceSlot { guard })
    }
}

fn time_until_ready(state: &PaceState, now: Instant) -> Option<Duration> {
    let last = state.last_request?;
    let elapsed = now.saturating_duration_since(last);
    (elapsed < state.min_delay).then(|| state.min_delay - elapsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_until_ready_first_request() {
        let state = PaceState {
            min_delay: Duration::from_secs(2),
            last_request: None,
        };
        assert_eq!(time_until_ready(&state, Instant::now()), None);
    }

    #[test]
    fn test_time_until_ready_waits_remaining() {
        let now = Instant::now();
        let state = PaceState {
            min_delay: Duration::from_millis(500),
            last_request: Some(now),
        };
        let wait = time_until_ready(&state, now + Duration::from_millis(200)).unwrap();
        assert_eq!(wait, Duration::from_millis(300));
        assert_eq!(
            time_until_ready(&state, now + Duration::from_millis(600)),
            None
        );
    }

    #[tokio::test]
    async fn test_consecutive_slots_are_spaced() {
        let pacer = Pacer::new(Duration::from_millis(50));
        let cancel = CancellationToken::new();
        let start = Instant::now();

        for _ in 0..4 {
            let slot = pacer.acquire(&cancel).await;
            assert!(slot.is_some());
        }

        assert!(start.elapsed() >= Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_clones_share_clock() {
        let pacer = Pacer::new(Duration::from_millis(60));
        let other = pacer.clone();
        let cancel = CancellationToken::new();
        let start = Instant::now();

        drop(pacer.acquire(&cancel).await);
        drop(other.acquire(&cancel).await);

        assert!(start.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_cancel_while_waiting() {
        let pacer = Pacer::new(Duration::from_secs(30));
        let cancel = CancellationToken::new();
        drop(pacer.acquire(&cancel).await);

        cancel.cancel();
        assert!(pacer.acquire(&cancel).await.is_none());
    }

    #[tokio::test]
    async fn test_raise_min_delay_only_increases() {
        let pacer = Pacer::new(Duration::from_secs(2));
        pacer.raise_min_delay(Duration::from_secs(1)).await;
        assert_eq!(pacer.min_delay().await, Duration::from_secs(2));
        pacer.raise_min_delay(Duration::from_secs(5)).await;
        assert_eq!(pacer.min_delay().await, Duration::from_secs(5));
    }
}
