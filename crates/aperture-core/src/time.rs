//! Wall-clock timestamps used throughout variety samples, audit entries, and DLQ bookkeeping.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// A millisecond-resolution Unix timestamp.
///
/// Stored as a plain integer (rather than `chrono::DateTime` at every call site)
/// so that ring buffers and KV-store records stay cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    /// Capture the current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or(0);
        Self(millis)
    }

    /// Wrap a raw millisecond value, e.g. when deserializing a persisted record.
    #[must_use]
    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the Unix epoch.
    #[must_use]
    pub fn as_millis(&self) -> i64 {
        self.0
    }

    /// Elapsed time between `self` and a later timestamp, saturating at zero.
    #[must_use]
    pub fn elapsed_until(&self, later: Timestamp) -> std::time::Duration {
        let delta = later.0.saturating_sub(self.0).max(0);
        #[allow(clippy::cast_sign_loss)]
        std::time::Duration::from_millis(delta as u64)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elapsed_until_is_monotonic_and_non_negative() {
        let a = Timestamp::from_millis(1_000);
        let b = Timestamp::from_millis(1_500);
        assert_eq!(a.elapsed_until(b).as_millis(), 500);
        assert_eq!(b.elapsed_until(a).as_millis(), 0);
    }
}
