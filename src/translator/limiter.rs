//! Combined rps/rpm admission gate. The scheduler's worker pool (a `Semaphore`
//! sized to `max_workers`) bounds concurrency; this bounds submission rate on top
//! of it.

use std::num::NonZeroU32;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

pub struct TaskLimiter {
    per_second: Option<Limiter>,
    per_minute: Option<Limiter>,
}

impl TaskLimiter {
    /// `rps = 0` disables the per-second gate; `rpm = 0` disables the per-minute one.
    pub fn new(rps: u32, rpm: u32) -> Self {
        Self {
            per_second: NonZeroU32::new(rps).map(|n| RateLimiter::direct(Quota::per_second(n))),
            per_minute: NonZeroU32::new(rpm).map(|n| RateLimiter::direct(Quota::per_minute(n))),
        }
    }

    /// Blocks the caller until both dials admit another request, whichever is
    /// currently tighter.
    pub async fn wait(&self) {
        if let Some(limiter) = &self.per_second {
            limiter.until_ready().await;
        }
        if let Some(limiter) = &self.per_minute {
            limiter.until_ready().await;
        }
    }
}

/// `governor`'s quotas need a tick duration only when burst sizes are customized;
/// the defaults (burst = quota rate) are what every call site here wants.
#[allow(dead_code)]
const MINUTE: Duration = Duration::from_secs(60);

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[tokio::test]
    async fn disabled_limiter_admits_immediately() {
        let limiter = TaskLimiter::new(0, 0);
        let start = Instant::now();
        for _ in 0..50 {
            limiter.wait().await;
        }
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test]
    async fn per_second_limiter_paces_requests() {
        let limiter = TaskLimiter::new(2, 0);
        let start = Instant::now();
        for _ in 0..3 {
            limiter.wait().await;
        }
        assert!(start.elapsed() >= Duration::from_millis(400));
    }
}
