//! Merge, dedup, and weighted-sum ranking (spec §4.10).

use std::cmp::Ordering;
use std::collections::HashMap;

use aperture_config::RankingWeights;

use crate::types::{RankedCandidate, ServerCandidate};

/// Merge candidates from every adapter and dedupe by `name@version`.
///
/// When two adapters report the same identity, the one with the higher
/// `source_trust` signal wins; ties are broken by source name so the result
/// is deterministic for a fixed input set.
#[must_use]
pub fn merge_and_dedupe(candidates: Vec<ServerCandidate>) -> Vec<ServerCandidate> {
    let mut by_identity: HashMap<String, ServerCandidate> = HashMap::new();
    for candidate in candidates {
        let identity = candidate.identity();
        match by_identity.get(&identity) {
            Some(existing) if !supersedes(&candidate, existing) => {}
            _ => {
                by_identity.insert(identity, candidate);
            }
        }
    }
    let mut merged: Vec<ServerCandidate> = by_identity.into_values().collect();
    merged.sort_by(|a, b| a.identity().cmp(&b.identity()));
    merged
}

fn supersedes(candidate: &ServerCandidate, existing: &ServerCandidate) -> bool {
    match candidate.signals.source_trust.partial_cmp(&existing.signals.source_trust) {
        Some(Ordering::Greater) => true,
        Some(Ordering::Less) => false,
        _ => candidate.source < existing.source,
    }
}

/// Score every candidate with the weighted-sum formula and sort descending.
///
/// Ties are broken by `name@version` so the ordering is deterministic.
#[must_use]
pub fn rank(candidates: Vec<ServerCandidate>, weights: &RankingWeights) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .map(|candidate| {
            let score = candidate.signals.capability_match * weights.capability_match
                + candidate.signals.quality * weights.quality
                + candidate.signals.recency * weights.recency
                + candidate.signals.source_trust * weights.source_trust;
            RankedCandidate { candidate, score }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.candidate.identity().cmp(&b.candidate.identity()))
    });
    ranked
}

/// Keep only the first `top_k` ranked candidates.
#[must_use]
pub fn truncate_top_k(mut ranked: Vec<RankedCandidate>, top_k: usize) -> Vec<RankedCandidate> {
    ranked.truncate(top_k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CandidateSignals;

    fn candidate(source: &str, name: &str, version: &str, source_trust: f64) -> ServerCandidate {
        ServerCandidate {
            source: source.into(),
            name: name.into(),
            version: version.into(),
            description: String::new(),
            source_ref: format!("npm:{name}@{version}"),
            signals: CandidateSignals { capability_match: 1.0, quality: 0.5, recency: 0.5, source_trust },
        }
    }

    #[test]
    fn dedup_keeps_the_more_trusted_source() {
        let merged = merge_and_dedupe(vec![
            candidate("catalog-a", "fs-server", "1.0.0", 0.4),
            candidate("catalog-b", "fs-server", "1.0.0", 0.9),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, "catalog-b");
    }

    #[test]
    fn dedup_breaks_ties_by_source_name() {
        let merged = merge_and_dedupe(vec![
            candidate("zeta", "fs-server", "1.0.0", 0.5),
            candidate("alpha", "fs-server", "1.0.0", 0.5),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].source, "alpha");
    }

    #[test]
    fn ranking_orders_by_descending_weighted_score() {
        let weights = RankingWeights::default();
        let ranked = rank(
            vec![candidate("a", "low", "1.0.0", 0.1), candidate("b", "high", "1.0.0", 0.9)],
            &weights,
        );
        assert_eq!(ranked[0].candidate.name, "high");
        assert!(ranked[0].score >= ranked[1].score);
    }

    #[test]
    fn top_k_truncates() {
        let weights = RankingWeights::default();
        let ranked = rank(
            vec![candidate("a", "one", "1.0.0", 0.1), candidate("b", "two", "1.0.0", 0.9)],
            &weights,
        );
        let truncated = truncate_top_k(ranked, 1);
        assert_eq!(truncated.len(), 1);
    }
}
