//! Minimum-interval rate limiting for external API clients
//!
//! Both upstream APIs this tool consumes publish request budgets
//! (setlist.fm: 2 req/s, MusicBrainz: 1 req/s). Callers hold one
//! `RateLimiter` per client and `wait()` before every request.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// Enforces a minimum interval between requests.
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    /// Wait if necessary to comply with the rate limit.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiter_stores_interval() {
        let limiter = RateLimiter::new(500);
        assert_eq!(limiter.min_interval, Duration::from_millis(500));
    }

    #[tokio::test]
    async fn consecutive_waits_are_spaced() {
        let limiter = RateLimiter::new(200);

        let start = Instant::now();

        // First request passes immediately
        limiter.wait().await;
        let first_elapsed = start.elapsed();

        // Second and third each wait ~200ms
        limiter.wait().await;
        let second_elapsed = start.elapsed();
        limiter.wait().await;
        let third_elapsed = start.elapsed();

        assert!(first_elapsed < Duration::from_millis(100));
        assert!(second_elapsed >= Duration::from_millis(180));
        assert!(third_elapsed >= Duration::from_millis(380));
    }
}
