//! Shared request budget across all outbound calls.
//!
//! The budget is an explicitly owned object held by the transport, never
//! ambient process-wide state, so independent transports (and tests) get
//! independent windows.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Request budget of `limit` calls per rolling `window`.
///
/// An over-budget caller suspends in [`RateBudget::acquire`] until a slot
/// frees; acquiring never fails.
#[derive(Clone)]
pub struct RateBudget {
    limiter: Arc<DirectRateLimiter>,
    clock: DefaultClock,
}

impl RateBudget {
    pub fn new(window: Duration, limit: u32) -> Self {
        let clock = DefaultClock::default();
        Self {
            limiter: Arc::new(RateLimiter::direct_with_clock(
                quota_from_window(window, limit),
                &clock,
            )),
            clock,
        }
    }

    /// Default provider budget: 60 requests per 60 seconds.
    pub fn per_minute(limit: u32) -> Self {
        Self::new(Duration::from_secs(60), limit)
    }

    /// Wait until a slot is available, then consume it.
    ///
    /// Sleeping is tokio-based, so wrapping the call in
    /// `tokio::time::timeout` cancels the wait promptly.
    pub async fn acquire(&self) {
        loop {
            match self.limiter.check() {
                Ok(_) => return,
                Err(not_until) => {
                    let wait = not_until.wait_time_from(self.clock.now());
                    // Minimum sleep so a zero wait still yields to the runtime.
                    tokio::time::sleep(wait.max(Duration::from_millis(1))).await;
                }
            }
        }
    }

    /// Consume a slot only if one is immediately available.
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateBudget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateBudget").finish_non_exhaustive()
    }
}

fn quota_from_window(window: Duration, limit: u32) -> Quota {
    let safe_limit = limit.max(1);
    let burst = NonZeroU32::new(safe_limit).expect("safe limit must be non-zero");

    let seconds_per_cell = (window.as_secs_f64() / f64::from(safe_limit)).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .expect("period is always greater than zero")
        .allow_burst(burst)
}
