//! Sliding-window rate limiter for outbound relay calls.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Admits at most `max_calls` acquisitions within any sliding window of
/// `period`.
///
/// The timestamp deque is held locked across the wait, so callers are
/// admitted strictly in arrival order — a burst of sends drains at the
/// configured rate instead of racing for freed slots.
pub struct RateLimiter {
    max_calls: usize,
    period: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    /// Build a limiter. `max_calls` is floored at 1.
    pub fn new(max_calls: u32, period: Duration) -> Self {
        Self {
            max_calls: max_calls.max(1) as usize,
            period,
            calls: Mutex::new(VecDeque::new()),
        }
    }

    /// Wait until a call is admitted, then record it.
    pub async fn acquire(&self) {
        let mut calls = self.calls.lock().await;
        loop {
            let now = Instant::now();
            while calls
                .front()
                .is_some_and(|&t| now.duration_since(t) >= self.period)
            {
                let _ = calls.pop_front();
            }
            if calls.len() < self.max_calls {
                calls.push_back(now);
                return;
            }
            if let Some(&oldest) = calls.front() {
                tokio::time::sleep_until(oldest + self.period).await;
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
