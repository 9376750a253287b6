//! Client-side request pacing.
//!
//! Enforces both per-second and per-minute ceilings for catalog requests.
//! Pacing only delays; a request is never dropped or retried here.

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// Rate limiter with dual constraints (per-second and per-minute)
#[derive(Debug)]
pub struct RateLimiter {
    /// Minimum spacing between two requests
    min_interval: Duration,
    /// Maximum requests per minute
    max_per_minute: usize,
    /// Last request timestamp
    last_request: Option<Instant>,
    /// Request timestamps in the last minute, oldest first
    recent_requests: VecDeque<Instant>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(max_per_second: f64, max_per_minute: u32) -> Self {
        let min_interval = if max_per_second > 0.0 {
            Duration::from_secs_f64(1.0 / max_per_second)
        } else {
            Duration::ZERO
        };

        Self {
            min_interval,
            max_per_minute: max_per_minute.max(1) as usize,
            last_request: None,
            recent_requests: VecDeque::with_capacity(max_per_minute as usize),
        }
    }

    /// Wait until a request can be made, respecting both rate limits
    pub async fn acquire(&mut self) {
        self.evict_expired(Instant::now());

        if self.recent_requests.len() >= self.max_per_minute {
            if let Some(&oldest) = self.recent_requests.front() {
                let wait_until = oldest + WINDOW;
                tracing::debug!(
                    wait_ms = wait_until.saturating_duration_since(Instant::now()).as_millis(),
                    "Rate limit: waiting for per-minute limit"
                );
                tokio::time::sleep_until(wait_until).await;
                self.evict_expired(Instant::now());
            }
        }

        if let Some(last) = self.last_request {
            let elapsed = Instant::now().saturating_duration_since(last);
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!(
                    wait_ms = wait_time.as_millis(),
                    "Rate limit: waiting for per-second limit"
                );
                sleep(wait_time).await;
            }
        }

        let request_time = Instant::now();
        self.last_request = Some(request_time);
        self.recent_requests.push_back(request_time);
    }

    /// Get the current number of requests in the last minute
    pub fn current_minute_count(&mut self) -> usize {
        self.evict_expired(Instant::now());
        self.recent_requests.len()
    }

    fn evict_expired(&mut self, now: Instant) {
        while let Some(&oldest) = self.recent_requests.front() {
            if now.saturating_duration_since(oldest) < WINDOW {
                break;
            }
            self.recent_requests.pop_front();
        }
    }
}
