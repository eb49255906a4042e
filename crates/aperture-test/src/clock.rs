//! A deterministic clock for exercising timeout and backoff logic without
//! real sleeps.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use aperture_core::Timestamp;

/// A clock that only advances when told to.
///
/// Tests that exercise the Supervisor's restart backoff or the Scheduler's
/// tick cadence construct one of these instead of sleeping in wall-clock
/// time.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Start the clock at a fixed point in time.
    #[must_use]
    pub fn starting_at(timestamp: Timestamp) -> Self {
        Self { millis: AtomicI64::new(timestamp.as_millis()) }
    }

    /// The clock's current reading.
    #[must_use]
    pub fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::Acquire))
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
        let delta = by.as_millis() as i64;
        self.millis.fetch_add(delta, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advancing_moves_the_clock_forward_by_exactly_the_given_duration() {
        let clock = ManualClock::starting_at(Timestamp::from_millis(1_000));
        clock.advance(Duration::from_millis(250));
        assert_eq!(clock.now().as_millis(), 1_250);
    }
}
