// =============================================================================
// Sliding-window rate limiter — per-provider outbound-call governor
// =============================================================================
//
// A process-local deque of acquisition timestamps guarded by a mutex, bounded
// to the configured window capacity (§5). `acquire` blocks the caller until a
// slot frees up rather than rejecting the call outright — callers are async
// tasks, not requests that need an immediate 429.
// =============================================================================

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

pub struct RateLimiter {
    capacity: usize,
    window: Duration,
    timestamps: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(capacity: usize, window: Duration) -> Self {
        RateLimiter {
            capacity,
            window,
            timestamps: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Finnhub-style default: 59 calls per rolling 60-second window.
    pub fn finnhub_default(capacity: u32) -> Self {
        Self::new(capacity as usize, Duration::from_secs(60))
    }

    /// Acquire a slot, blocking (without holding the lock across the await)
    /// until the window has room. Thread-safe across any interleaving of
    /// callers; never admits more than `capacity` acquisitions within any
    /// rolling `window`.
    pub async fn acquire(&self, provider: &str) {
        loop {
            let wait = {
                let mut ts = self.timestamps.lock();
                let now = Instant::now();
                while let Some(&oldest) = ts.front() {
                    if now.duration_since(oldest) >= self.window {
                        ts.pop_front();
                    } else {
                        break;
                    }
                }
                if ts.len() < self.capacity {
                    ts.push_back(now);
                    None
                } else {
                    let oldest = *ts.front().unwrap();
                    Some(self.window.saturating_sub(now.duration_since(oldest)))
                }
            };

            match wait {
                None => return,
                Some(delay) => {
                    debug!(provider = %provider, delay_ms = delay.as_millis(), "rate limiter at capacity, waiting");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn admits_up_to_capacity_immediately() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire("test").await;
        }
        assert!(Instant::now().duration_since(start) < Duration::from_millis(50));
    }

    #[tokio::test(start_paused = true)]
    async fn sixth_of_six_is_delayed_past_the_window() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let start = Instant::now();
        for _ in 0..6 {
            limiter.acquire("test").await;
        }
        assert!(Instant::now().duration_since(start) >= Duration::from_secs(60));
    }
}
