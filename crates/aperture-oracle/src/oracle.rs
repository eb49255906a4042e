//! The [`AdvisoryOracle`] seam and its blending into Discovery's ranked
//! output (spec §4.17).

use std::time::Duration;

use aperture_discovery::{RankedCandidate, ServerCandidate};
use async_trait::async_trait;
use tracing::{trace, warn};

use crate::error::{OracleError, OracleResult};

/// An optional, external scoring source consulted after Discovery has
/// already ranked candidates with its own signals.
///
/// An oracle never blocks acquisition: [`consult`] wraps every call in a
/// timeout and treats any error or expiry as "no opinion" for that
/// candidate, leaving its Discovery-assigned score untouched.
#[async_trait]
pub trait AdvisoryOracle: Send + Sync {
    /// Offer an opinion on `candidate`, in the same `[0.0, 1.0]` scale as
    /// Discovery's own signals. `Ok(None)` means the oracle has no opinion;
    /// `Err` is treated identically to a timeout (spec §4.17).
    async fn advise(&self, candidate: &ServerCandidate) -> OracleResult<Option<f64>>;
}

/// Tunables for blending oracle opinions into Discovery's ranking.
#[derive(Debug, Clone, Copy)]
pub struct OracleConfig {
    /// How much weight the oracle's opinion carries against the
    /// Discovery-assigned score. `0.0` (the default) disables blending
    /// entirely even when an oracle is configured (spec §4.17 "zero
    /// default weight").
    pub weight: f64,
    /// Per-candidate deadline; an oracle call that does not return within
    /// this is treated as "no opinion".
    pub timeout: Duration,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self { weight: 0.0, timeout: Duration::from_millis(200) }
    }
}

/// Re-score `ranked` by blending in `oracle`'s opinion at `config.weight`,
/// preserving Discovery's ordering whenever the oracle has nothing to add.
///
/// With `config.weight <= 0.0` this is a no-op pass-through regardless of
/// whether `oracle` is present, matching the Open Question resolution that
/// the oracle never influences ranking unless an operator opts in.
pub async fn consult(
    ranked: Vec<RankedCandidate>,
    oracle: Option<&dyn AdvisoryOracle>,
    config: &OracleConfig,
) -> Vec<RankedCandidate> {
    let Some(oracle) = oracle else { return ranked };
    if config.weight <= 0.0 {
        return ranked;
    }

    let mut blended = Vec::with_capacity(ranked.len());
    for mut item in ranked {
        match tokio::time::timeout(config.timeout, oracle.advise(&item.candidate)).await {
            Ok(Ok(Some(opinion))) => {
                let opinion = opinion.clamp(0.0, 1.0);
                item.score = (1.0 - config.weight).mul_add(item.score, config.weight * opinion);
                trace!(name = %item.candidate.name, opinion, "oracle blended into candidate score");
            }
            Ok(Ok(None)) => {}
            Ok(Err(err)) => {
                warn!(name = %item.candidate.name, error = %err, "oracle call failed, ignoring");
            }
            Err(_elapsed) => {
                warn!(name = %item.candidate.name, "oracle call timed out, ignoring");
            }
        }
        blended.push(item);
    }

    blended.sort_by(|a, b| b.score.total_cmp(&a.score));
    blended
}

#[cfg(test)]
mod tests {
    use super::*;
    use aperture_discovery::CandidateSignals;

    struct FixedOracle(f64);

    #[async_trait]
    impl AdvisoryOracle for FixedOracle {
        async fn advise(&self, _candidate: &ServerCandidate) -> OracleResult<Option<f64>> {
            Ok(Some(self.0))
        }
    }

    struct SlowOracle;

    #[async_trait]
    impl AdvisoryOracle for SlowOracle {
        async fn advise(&self, _candidate: &ServerCandidate) -> OracleResult<Option<f64>> {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Some(1.0))
        }
    }

    struct FailingOracle;

    #[async_trait]
    impl AdvisoryOracle for FailingOracle {
        async fn advise(&self, _candidate: &ServerCandidate) -> OracleResult<Option<f64>> {
            Err(OracleError::CallFailed("unreachable".into()))
        }
    }

    fn candidate(name: &str, score: f64) -> RankedCandidate {
        RankedCandidate {
            candidate: ServerCandidate {
                source: "catalog".into(),
                name: name.into(),
                version: "1.0.0".into(),
                description: String::new(),
                source_ref: format!("npm:{name}@1.0.0"),
                signals: CandidateSignals { capability_match: 1.0, quality: 1.0, recency: 1.0, source_trust: 1.0 },
            },
            score,
        }
    }

    #[tokio::test]
    async fn zero_weight_is_a_no_op_even_with_an_oracle_present() {
        let ranked = vec![candidate("a", 0.9), candidate("b", 0.1)];
        let oracle = FixedOracle(0.0);
        let config = OracleConfig { weight: 0.0, timeout: Duration::from_millis(50) };

        let result = consult(ranked.clone(), Some(&oracle), &config).await;
        assert_eq!(result[0].candidate.name, ranked[0].candidate.name);
        assert_eq!(result[0].score, ranked[0].score);
    }

    #[tokio::test]
    async fn no_oracle_configured_is_a_no_op() {
        let ranked = vec![candidate("a", 0.9), candidate("b", 0.1)];
        let config = OracleConfig { weight: 1.0, timeout: Duration::from_millis(50) };
        let result = consult(ranked.clone(), None, &config).await;
        assert_eq!(result[0].score, ranked[0].score);
    }

    #[tokio::test]
    async fn opinion_can_reorder_candidates() {
        let ranked = vec![candidate("a", 0.9), candidate("b", 0.1)];
        let oracle = FixedOracle(0.0); // strongly disagrees with Discovery
        let config = OracleConfig { weight: 1.0, timeout: Duration::from_millis(50) };

        let result = consult(ranked, Some(&oracle), &config).await;
        // weight 1.0 means the final score is entirely the oracle's opinion,
        // which is identical for both candidates; order becomes stable-ish
        // but neither score should retain its original Discovery value.
        assert!(result.iter().all(|c| c.score == 0.0));
    }

    #[tokio::test]
    async fn failing_oracle_call_is_ignored() {
        let ranked = vec![candidate("a", 0.9)];
        let oracle = FailingOracle;
        let config = OracleConfig { weight: 1.0, timeout: Duration::from_millis(50) };

        let result = consult(ranked.clone(), Some(&oracle), &config).await;
        assert_eq!(result[0].score, ranked[0].score);
    }

    #[tokio::test]
    async fn timed_out_oracle_call_is_ignored() {
        let ranked = vec![candidate("a", 0.9)];
        let oracle = SlowOracle;
        let config = OracleConfig { weight: 1.0, timeout: Duration::from_millis(10) };

        let result = consult(ranked.clone(), Some(&oracle), &config).await;
        assert_eq!(result[0].score, ranked[0].score);
    }
}
