//! Sliding-window rate limiter shared by every fetch in the process.
//!
//! Admits at most `max_calls` acquisitions within any trailing `period`.
//! Callers over quota wait for the oldest call to age out; nothing is
//! rejected.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use docfetch_shared::RateLimitConfig;

/// Fixed-quota limiter over a rolling time window.
#[derive(Debug)]
pub struct SlidingWindowRateLimiter {
    max_calls: usize,
    period: Duration,
    /// Admission times of calls still inside the window, oldest first.
    window: Mutex<VecDeque<Instant>>,
}

impl SlidingWindowRateLimiter {
    /// A limiter admitting `max_calls` per `period`. A zero quota is treated as one.
    pub fn new(max_calls: usize, period: Duration) -> Self {
        let max_calls = max_calls.max(1);
        Self {
            max_calls,
            period,
            window: Mutex::new(VecDeque::with_capacity(max_calls)),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_calls, config.period())
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Wait until the window has room, then record this call.
    pub async fn acquire(&self) {
        loop {
            let wait = {
                let mut window = self.window.lock().await;
                let now = Instant::now();
                self.evict_expired(&mut window, now);

                if window.len() < self.max_calls {
                    window.push_back(now);
                    return;
                }

                // Full: the oldest entry is the next to leave.
                match window.front() {
                    Some(&oldest) => (oldest + self.period).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };

            debug!(wait_ms = wait.as_millis() as u64, "rate limit reached, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Record a call if the window has room right now; never waits.
    pub async fn try_acquire(&self) -> bool {
        let mut window = self.window.lock().await;
        let now = Instant::now();
        self.evict_expired(&mut window, now);

        if window.len() < self.max_calls {
            window.push_back(now);
            true
        } else {
            false
        }
    }

    /// Slots free in the current window.
    pub async fn available(&self) -> usize {
        let mut window = self.window.lock().await;
        self.evict_expired(&mut window, Instant::now());
        self.max_calls - window.len()
    }

    fn evict_expired(&self, window: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = window.front() {
            if now.duration_since(oldest) >= self.period {
                window.pop_front();
            } else {
                break;
            }
        }
    }
}

impl Default for SlidingWindowRateLimiter {
    fn default() -> Self {
        Self::from_config(&RateLimitConfig::default())
    }
}
