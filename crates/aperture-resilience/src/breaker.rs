//! Per-target circuit breaker (spec §4.6).

use std::time::{Duration, Instant};

use aperture_core::ServerId;
use aperture_events::{ApertureEvent, BreakerState, EventBus};
use aperture_core::Timestamp;
use parking_lot::Mutex;

use crate::error::{ResilienceError, ResilienceResult};

/// Tunables for one breaker instance.
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Consecutive failures in `closed` before tripping to `open`.
    pub failure_threshold: u32,
    /// Consecutive successes in `half_open` before closing.
    pub success_threshold: u32,
    /// How long `open` waits before admitting a probe call.
    pub open_timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self { failure_threshold: 5, success_threshold: 2, open_timeout: Duration::from_secs(30) }
    }
}

#[derive(Debug)]
enum Inner {
    Closed { consecutive_failures: u32 },
    Open { opened_at: Instant },
    HalfOpen { probe_in_flight: bool, consecutive_successes: u32 },
}

/// A single per-`server_id` circuit breaker.
///
/// `closed` counts consecutive failures toward `failure_threshold`; on
/// tripping it moves to `open`, which fails fast until `open_timeout`
/// elapses, then admits exactly one probe in `half_open`. The probe's
/// outcome either closes the breaker (after `success_threshold`
/// consecutive half-open successes) or reopens it immediately.
pub struct CircuitBreaker {
    server_id: ServerId,
    config: BreakerConfig,
    state: Mutex<Inner>,
    events: Option<EventBus>,
}

impl CircuitBreaker {
    /// Create a breaker for `server_id`, starting `closed`.
    #[must_use]
    pub fn new(server_id: ServerId, config: BreakerConfig) -> Self {
        Self { server_id, config, state: Mutex::new(Inner::Closed { consecutive_failures: 0 }), events: None }
    }

    /// Attach an event bus; state transitions are published to it.
    #[must_use]
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Check whether a call may proceed right now.
    ///
    /// In `half_open`, only the first caller after the timeout is admitted;
    /// concurrent callers are rejected until that probe resolves.
    ///
    /// # Errors
    /// Returns [`ResilienceError::CircuitOpen`] if the breaker is open (or
    /// a probe is already in flight).
    pub fn try_acquire(&self) -> ResilienceResult<()> {
        let mut state = self.state.lock();
        match &*state {
            Inner::Closed { .. } => Ok(()),
            Inner::Open { opened_at } => {
                if opened_at.elapsed() >= self.config.open_timeout {
                    *state = Inner::HalfOpen { probe_in_flight: true, consecutive_successes: 0 };
                    drop(state);
                    self.emit(BreakerState::Open, BreakerState::HalfOpen);
                    Ok(())
                } else {
                    Err(ResilienceError::CircuitOpen)
                }
            }
            Inner::HalfOpen { probe_in_flight, .. } => {
                if *probe_in_flight {
                    Err(ResilienceError::CircuitOpen)
                } else {
                    Ok(())
                }
            }
        }
    }

    /// Record a successful call.
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        match &mut *state {
            Inner::Closed { consecutive_failures } => *consecutive_failures = 0,
            Inner::Open { .. } => {}
            Inner::HalfOpen { probe_in_flight, consecutive_successes } => {
                *consecutive_successes += 1;
                if *consecutive_successes >= self.config.success_threshold {
                    *state = Inner::Closed { consecutive_failures: 0 };
                    drop(state);
                    self.emit(BreakerState::HalfOpen, BreakerState::Closed);
                } else {
                    *probe_in_flight = false;
                }
            }
        }
    }

    /// Record a failed call. Only failures whose [`aperture_core::ErrorKind`]
    /// counts toward the breaker (spec §7) should reach this method.
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        match &mut *state {
            Inner::Closed { consecutive_failures } => {
                *consecutive_failures += 1;
                if *consecutive_failures >= self.config.failure_threshold {
                    *state = Inner::Open { opened_at: Instant::now() };
                    drop(state);
                    self.emit(BreakerState::Closed, BreakerState::Open);
                }
            }
            Inner::Open { .. } => {}
            Inner::HalfOpen { .. } => {
                *state = Inner::Open { opened_at: Instant::now() };
                drop(state);
                self.emit(BreakerState::HalfOpen, BreakerState::Open);
            }
        }
    }

    /// The current state, for diagnostics and the admin surface.
    #[must_use]
    pub fn state(&self) -> BreakerState {
        match &*self.state.lock() {
            Inner::Closed { .. } => BreakerState::Closed,
            Inner::Open { .. } => BreakerState::Open,
            Inner::HalfOpen { .. } => BreakerState::HalfOpen,
        }
    }

    fn emit(&self, from: BreakerState, to: BreakerState) {
        if let Some(events) = &self.events {
            events.publish(ApertureEvent::BreakerStateChanged {
                at: Timestamp::now(),
                server_id: self.server_id,
                from,
                to,
            });
        }
        tracing::info!(server_id = %self.server_id, ?from, ?to, "circuit breaker transitioned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(
            ServerId::new(),
            BreakerConfig { failure_threshold: 2, success_threshold: 2, open_timeout: Duration::from_millis(10) },
        )
    }

    #[test]
    fn opens_after_threshold_failures() {
        let breaker = breaker();
        breaker.try_acquire().unwrap();
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
        assert!(breaker.try_acquire().is_err());
    }

    #[test]
    fn half_open_failure_reopens_immediately() {
        let breaker = breaker();
        breaker.record_failure();
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(15));
        breaker.try_acquire().unwrap();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.record_failure();
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn half_open_closes_after_success_threshold() {
        let breaker = breaker();
        breaker.record_failure();
        breaker.record_failure();
        std::thread::sleep(Duration::from_millis(15));
        breaker.try_acquire().unwrap();
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::HalfOpen);
        breaker.try_acquire().unwrap();
        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }
}
