//! Sliding-window limiter for outbound RPC calls.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

const WINDOW: Duration = Duration::from_secs(1);

/// Admits at most `rate` calls in any trailing one-second window.
///
/// Keeps the timestamps of the last `rate` admissions. One instance is
/// shared (behind an `Arc`) by every concurrent fetch task; waiters queue
/// on the inner mutex and are admitted in arrival order.
#[derive(Debug)]
pub struct RateLimiter {
    rate: usize,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Creates a limiter for `calls_per_second` calls. Zero is treated as one.
    #[must_use]
    pub fn new(calls_per_second: u32) -> Self {
        let rate = (calls_per_second as usize).max(1);
        Self {
            rate,
            admitted: Mutex::new(VecDeque::with_capacity(rate)),
        }
    }

    #[must_use]
    pub fn rate(&self) -> usize {
        self.rate
    }

    /// Waits until one more call fits in the window, then records it.
    pub async fn acquire(&self) {
        let mut admitted = self.admitted.lock().await;
        if admitted.len() >= self.rate {
            if let Some(&oldest) = admitted.front() {
                let ready_at = oldest + WINDOW;
                if ready_at > Instant::now() {
                    tracing::trace!(
                        wait_ms = (ready_at - Instant::now()).as_millis() as u64,
                        "Rate limit reached, waiting"
                    );
                    sleep_until(ready_at).await;
                }
            }
            admitted.pop_front();
        }
        admitted.push_back(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_first_rate_calls_are_immediate() {
        let limiter = RateLimiter::new(5);
        let start = Instant::now();
        for _ in 0..5 {
            limiter.acquire().await;
        }
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_over_rate_waits_for_window() {
        let limiter = RateLimiter::new(2);
        let start = Instant::now();
        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;
        assert!(Instant::now() - start >= WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_acquires_never_exceed_rate_per_second() {
        let rate = 10;
        let limiter = Arc::new(RateLimiter::new(rate));
        let stamps = Arc::new(Mutex::new(Vec::new()));

        let mut handles = Vec::new();
        for _ in 0..45 {
            let limiter = Arc::clone(&limiter);
            let stamps = Arc::clone(&stamps);
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                stamps.lock().await.push(Instant::now());
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut stamps = stamps.lock().await.clone();
        stamps.sort();
        assert_eq!(stamps.len(), 45);
        let rate = rate as usize;
        for i in rate..stamps.len() {
            assert!(
                stamps[i] - stamps[i - rate] >= WINDOW,
                "calls {} and {} are closer than one second",
                i - rate,
                i
            );
        }
    }

    #[test]
    fn test_zero_rate_clamped() {
        assert_eq!(RateLimiter::new(0).rate(), 1);
    }
}
