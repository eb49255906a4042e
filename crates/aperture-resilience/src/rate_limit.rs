//! Sliding-window rate limiter, per `(server_id, method)` (spec §4.9).

use std::time::{Duration, Instant};

use aperture_core::ServerId;
use dashmap::DashMap;
use parking_lot::Mutex;

/// Window width and request ceiling shared by every `(server_id, method)`
/// tracker.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Width of the sliding window.
    pub window: Duration,
    /// Maximum requests admitted within the window.
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self { window: Duration::from_secs(1), max_requests: 50 }
    }
}

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateLimitDecision {
    /// The call may proceed.
    Allowed,
    /// The call is rejected; retry after the given delay.
    Denied {
        /// Hint for how long the caller should wait before retrying.
        retry_after: Duration,
    },
}

impl RateLimitDecision {
    /// Whether this decision allows the call to proceed.
    #[must_use]
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

struct Window {
    timestamps: Mutex<Vec<Instant>>,
}

impl Window {
    fn new() -> Self {
        Self { timestamps: Mutex::new(Vec::new()) }
    }

    fn check(&self, config: RateLimitConfig) -> RateLimitDecision {
        let now = Instant::now();
        let window_start = now.checked_sub(config.window).unwrap_or(now);
        let mut timestamps = self.timestamps.lock();
        timestamps.retain(|t| *t > window_start);

        if timestamps.len() >= config.max_requests as usize {
            let oldest = timestamps.iter().min().copied().unwrap_or(now);
            let retry_after = (oldest + config.window).saturating_duration_since(now);
            return RateLimitDecision::Denied { retry_after };
        }
        timestamps.push(now);
        RateLimitDecision::Allowed
    }
}

/// Rate limiter keyed by `(server_id, method)`. Does not block the
/// caller — a denied call fails immediately with the retry-after hint
/// (spec §4.9).
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<(ServerId, String), Window>,
}

impl RateLimiter {
    /// Create a limiter applying `config` uniformly to every key.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self { config, windows: DashMap::new() }
    }

    /// Check and, if allowed, record a call to `method` on `server_id`.
    pub fn check(&self, server_id: ServerId, method: &str) -> RateLimitDecision {
        let key = (server_id, method.to_string());
        let window = self.windows.entry(key).or_insert_with(Window::new);
        window.check(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_up_to_the_limit_then_denies() {
        let limiter = RateLimiter::new(RateLimitConfig { window: Duration::from_millis(50), max_requests: 2 });
        let server = ServerId::new();
        assert!(limiter.check(server, "tools/call").is_allowed());
        assert!(limiter.check(server, "tools/call").is_allowed());
        assert!(!limiter.check(server, "tools/call").is_allowed());
    }

    #[test]
    fn different_methods_have_independent_windows() {
        let limiter = RateLimiter::new(RateLimitConfig { window: Duration::from_secs(1), max_requests: 1 });
        let server = ServerId::new();
        assert!(limiter.check(server, "tools/call").is_allowed());
        assert!(limiter.check(server, "tools/list").is_allowed());
    }

    #[test]
    fn window_resets_after_elapsing() {
        let limiter = RateLimiter::new(RateLimitConfig { window: Duration::from_millis(10), max_requests: 1 });
        let server = ServerId::new();
        assert!(limiter.check(server, "x").is_allowed());
        std::thread::sleep(Duration::from_millis(15));
        assert!(limiter.check(server, "x").is_allowed());
    }
}
