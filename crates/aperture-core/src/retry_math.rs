//! The full-jitter exponential backoff formula (spec §4.7), shared by the Retry
//! policy and the Supervisor's restart backoff so the two don't drift apart.

use std::time::Duration;

/// Compute the delay before attempt `attempt` (1-indexed).
///
/// `delay(n) = min(initial * factor^(n-1), max) * (1 - jitter * rand())`, the
/// full-jitter variant named in the spec: jitter always *shortens* the nominal
/// delay, never lengthens it, so `max_delay` remains a true ceiling.
#[must_use]
pub fn backoff_delay(
    attempt: u32,
    initial: Duration,
    max: Duration,
    factor: f64,
    jitter: f64,
) -> Duration {
    let attempt = attempt.max(1);
    let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
    let nominal_secs = initial.as_secs_f64() * factor.powi(exponent);
    let capped_secs = nominal_secs.min(max.as_secs_f64()).max(0.0);

    let jitter = jitter.clamp(0.0, 1.0);
    let roll: f64 = rand::random();
    let jittered_secs = capped_secs * (1.0 - jitter * roll);

    Duration::from_secs_f64(jittered_secs.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_never_exceeds_max() {
        let max = Duration::from_secs(60);
        for attempt in 1..20 {
            let d = backoff_delay(attempt, Duration::from_secs(1), max, 2.0, 0.0);
            assert!(d <= max);
        }
    }

    #[test]
    fn zero_jitter_is_deterministic() {
        let a = backoff_delay(3, Duration::from_secs(1), Duration::from_secs(60), 2.0, 0.0);
        let b = backoff_delay(3, Duration::from_secs(1), Duration::from_secs(60), 2.0, 0.0);
        assert_eq!(a, b);
        assert_eq!(a, Duration::from_secs(4));
    }

    #[test]
    fn full_jitter_only_shortens_delay() {
        let nominal = backoff_delay(4, Duration::from_secs(1), Duration::from_secs(60), 2.0, 0.0);
        for _ in 0..50 {
            let jittered =
                backoff_delay(4, Duration::from_secs(1), Duration::from_secs(60), 2.0, 1.0);
            assert!(jittered <= nominal);
        }
    }
}
