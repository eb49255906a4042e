//! The discovery fan-out engine (spec §4.10).

use std::sync::Arc;

use aperture_config::Config;
use futures::future::join_all;
use tracing::warn;

use crate::adapter::CatalogAdapter;
use crate::error::{DiscoveryError, DiscoveryResult};
use crate::ranking::{merge_and_dedupe, rank, truncate_top_k};
use crate::types::{DiscoveryQuery, Priority, RankedCandidate};

/// Fans a [`DiscoveryQuery`] out to every configured [`CatalogAdapter`] in
/// parallel, merges and ranks the results.
pub struct DiscoveryEngine {
    adapters: Vec<Arc<dyn CatalogAdapter>>,
}

impl DiscoveryEngine {
    /// Build an engine over a fixed set of adapters, selected by
    /// configuration at startup (spec §9 — no runtime type sniffing).
    #[must_use]
    pub fn new(adapters: Vec<Arc<dyn CatalogAdapter>>) -> Self {
        Self { adapters }
    }

    /// Run `query` against every adapter within `config.timeouts.discovery_deadline()`,
    /// merge/dedupe by `name@version`, and return the ranked, top-K-truncated result.
    ///
    /// A slow or failing adapter does not fail the whole query: its result is
    /// simply absent from the merge. Only a total absence of candidates (every
    /// adapter failed or the deadline elapsed before any replied) is an error.
    ///
    /// # Errors
    /// Returns [`DiscoveryError::NoCandidates`] if no adapter returned a
    /// candidate.
    pub async fn discover(&self, query: &DiscoveryQuery, config: &Config) -> DiscoveryResult<Vec<RankedCandidate>> {
        let deadline = config.timeouts.discovery_deadline();
        let total = self.adapters.len();

        let fan_out = join_all(self.adapters.iter().map(|adapter| {
            let adapter = Arc::clone(adapter);
            let query = query.clone();
            async move { adapter.query(&query).await }
        }));

        let results = match tokio::time::timeout(deadline, fan_out).await {
            Ok(results) => results,
            Err(_elapsed) => {
                warn!(capability = %query.capability, deadline_ms = deadline.as_millis(), "discovery deadline elapsed");
                return Err(DiscoveryError::DeadlineElapsed { completed: 0, total });
            }
        };

        let mut candidates = Vec::new();
        for (adapter, result) in self.adapters.iter().zip(results) {
            match result {
                Ok(found) => candidates.extend(found),
                Err(err) => {
                    warn!(source = adapter.source_name(), error = %err, "catalog adapter query failed");
                }
            }
        }

        if candidates.is_empty() {
            return Err(DiscoveryError::NoCandidates(query.capability.to_string()));
        }

        let merged = merge_and_dedupe(candidates);
        let weights = match query.priority {
            Priority::Normal => &config.policies.ranking_weights,
            Priority::SecurityCritical => &config.policies.security_critical_weights,
        };
        let ranked = rank(merged, weights);
        Ok(truncate_top_k(ranked, config.limits.discovery_top_k))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::CatalogAdapter;
    use crate::types::{CandidateSignals, ServerCandidate};
    use async_trait::async_trait;

    struct StubAdapter {
        name: &'static str,
        candidates: Vec<ServerCandidate>,
    }

    #[async_trait]
    impl CatalogAdapter for StubAdapter {
        fn source_name(&self) -> &str {
            self.name
        }

        async fn query(&self, _query: &DiscoveryQuery) -> DiscoveryResult<Vec<ServerCandidate>> {
            Ok(self.candidates.clone())
        }
    }

    struct FailingAdapter;

    #[async_trait]
    impl CatalogAdapter for FailingAdapter {
        fn source_name(&self) -> &str {
            "failing"
        }

        async fn query(&self, _query: &DiscoveryQuery) -> DiscoveryResult<Vec<ServerCandidate>> {
            Err(DiscoveryError::AdapterFailed { source: "failing".into(), message: "boom".into() })
        }
    }

    fn candidate(name: &str) -> ServerCandidate {
        ServerCandidate {
            source: "stub".into(),
            name: name.into(),
            version: "1.0.0".into(),
            description: String::new(),
            source_ref: format!("npm:{name}@1.0.0"),
            signals: CandidateSignals { capability_match: 1.0, quality: 0.8, recency: 0.8, source_trust: 0.8 },
        }
    }

    #[tokio::test]
    async fn merges_results_across_adapters_and_ignores_failures() {
        let engine = DiscoveryEngine::new(vec![
            Arc::new(StubAdapter { name: "a", candidates: vec![candidate("fs-server")] }),
            Arc::new(FailingAdapter),
        ]);
        let query = DiscoveryQuery::for_capability("filesystem");
        let config = Config::default();

        let ranked = engine.discover(&query, &config).await.unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].candidate.name, "fs-server");
    }

    #[tokio::test]
    async fn no_candidates_from_any_adapter_is_an_error() {
        let engine = DiscoveryEngine::new(vec![Arc::new(FailingAdapter)]);
        let query = DiscoveryQuery::for_capability("filesystem");
        let config = Config::default();

        let err = engine.discover(&query, &config).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::NoCandidates(_)));
    }
}
