//! Per-provider outbound rate budget.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Quota gate consulted before each upstream call. Free-tier providers get a
/// tight quota; exchanges a generous one.
#[derive(Clone)]
pub struct RateGate {
    limiter: Arc<DirectRateLimiter>,
}

impl RateGate {
    pub fn new(window: Duration, limit: u32) -> Self {
        let cells = NonZeroU32::new(limit.max(1)).expect("limit is clamped to >= 1");
        let replenish = window
            .checked_div(cells.get())
            .filter(|interval| !interval.is_zero())
            .unwrap_or(Duration::from_millis(1));

        let quota = Quota::with_period(replenish)
            .expect("replenish interval is non-zero")
            .allow_burst(cells);

        Self {
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// 60 requests per minute, the ceiling applied to free-tier upstreams.
    pub fn free_tier() -> Self {
        Self::new(Duration::from_secs(60), 60)
    }

    /// 1200 requests per minute, the public spot API weight class.
    pub fn exchange_tier() -> Self {
        Self::new(Duration::from_secs(60), 1200)
    }

    /// Returns whether rate budget is available, consuming one cell if so.
    pub fn acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
