//! Fixed-window rate limiter for purge quota.
//!
//! [`FixedWindowLimiter`] counts units (URLs) consumed since the start of the
//! current window. A request that fits in the remaining quota is admitted at
//! once, so a full window's worth of work can burst at the start of each
//! window. A request that does not fit must wait for the window to roll over,
//! at which point the counter resets.

use tokio::time::{Duration, Instant};
use tracing::{debug, info};

use crate::clock::Clock;

/// Length of one quota window.
pub const WINDOW: Duration = Duration::from_secs(60);

/// Fixed-window limiter: at most `limit` units per window.
#[derive(Debug)]
pub struct FixedWindowLimiter {
    limit: u64,
    window: Duration,
    state: Option<WindowState>,
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    started: Instant,
    used: u64,
}

impl FixedWindowLimiter {
    /// A limiter allowing `limit` units per minute.
    pub fn per_minute(limit: u64) -> Self {
        Self::new(limit, WINDOW)
    }

    /// A limiter allowing `limit` units per `window`.
    pub fn new(limit: u64, window: Duration) -> Self {
        Self {
            limit,
            window,
            state: None,
        }
    }

    /// Units allowed per window.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Units consumed in the current window.
    pub fn used(&self) -> u64 {
        self.state.map(|s| s.used).unwrap_or(0)
    }

    /// Try to consume `cost` units at `now`.
    ///
    /// Returns [`Duration::ZERO`] if the units were consumed, otherwise how
    /// long to wait before the current window rolls over. The first request
    /// of a window is always admitted, even if `cost` exceeds the limit.
    pub fn try_acquire(&mut self, cost: u64, now: Instant) -> Duration {
        let state = match self.state {
            Some(s) if now.duration_since(s.started) < self.window => s,
            _ => WindowState {
                started: now,
                used: 0,
            },
        };

        if state.used == 0 || state.used + cost <= self.limit {
            self.state = Some(WindowState {
                started: state.started,
                used: state.used + cost,
            });
            return Duration::ZERO;
        }

        self.state = Some(state);
        (state.started + self.window).saturating_duration_since(now)
    }

    /// Consume `cost` units, sleeping on `clock` until the quota allows it.
    ///
    /// Returns the number of waits that were needed.
    pub async fn acquire(&mut self, cost: u64, clock: &dyn Clock) -> usize {
        let mut waits = 0;
        loop {
            let wait = self.try_acquire(cost, clock.now());
            if wait.is_zero() {
                debug!(cost, used = self.used(), "purge quota acquired");
                return waits;
            }
            info!(
                wait_secs = wait.as_secs_f64(),
                used = self.used(),
                limit = self.limit,
                "purge quota exhausted, waiting for the next window"
            );
            clock.sleep(wait).await;
            waits += 1;
        }
    }
}
