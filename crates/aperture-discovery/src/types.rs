//! Discovery's own data model (spec §3 `ServerCandidate`, §4.10).

use aperture_core::CapabilityName;
use serde::{Deserialize, Serialize};

/// Priority hint attached to a discovery requirement; rotates which
/// [`aperture_config::RankingWeights`] table is applied (spec §4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// The default weighting table.
    Normal,
    /// Favors source trust over capability match, for sensitive capabilities.
    SecurityCritical,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

/// A requirement handed to the discovery engine by the Orchestrator.
#[derive(Debug, Clone)]
pub struct DiscoveryQuery {
    /// The capability being sought.
    pub capability: CapabilityName,
    /// Free-text keywords narrowing the search, if any.
    pub keywords: Vec<String>,
    /// Which ranking weight table to apply.
    pub priority: Priority,
}

impl DiscoveryQuery {
    /// Build a query for a bare capability with no keywords, normal priority.
    #[must_use]
    pub fn for_capability(capability: impl Into<CapabilityName>) -> Self {
        Self { capability: capability.into(), keywords: Vec::new(), priority: Priority::Normal }
    }

    /// Attach keywords.
    #[must_use]
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Attach a priority hint.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }
}

/// Source-specific signals normalised to a common scale of `[0.0, 1.0]`
/// (spec §4.10 ranking inputs (b)-(d)).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateSignals {
    /// How well the candidate's declared capability matches the query.
    pub capability_match: f64,
    /// A quality/popularity signal (e.g. download count, stars, normalised).
    pub quality: f64,
    /// How recently the candidate was maintained.
    pub recency: f64,
    /// How much the catalog source itself is trusted.
    pub source_trust: f64,
}

/// A discovered, not-yet-installed server (spec §3 `ServerCandidate`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCandidate {
    /// The catalog tag this candidate came from.
    pub source: String,
    /// The candidate's package/repo name.
    pub name: String,
    /// The candidate's version string.
    pub version: String,
    /// A short human-readable description.
    pub description: String,
    /// How to fetch this candidate, in [`aperture_installer::InstallMethod::from_source_ref`]
    /// syntax (e.g. `npm:pkg@1.0.0`, `github:org/repo@v1`).
    pub source_ref: String,
    /// Normalised ranking signals.
    pub signals: CandidateSignals,
}

impl ServerCandidate {
    /// `name@version`, the identity used for merge/dedup and install locking.
    #[must_use]
    pub fn identity(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// A candidate after scoring, in descending-score order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// The candidate itself.
    pub candidate: ServerCandidate,
    /// The weighted-sum score that placed it (spec §4.10).
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_combines_name_and_version() {
        let candidate = ServerCandidate {
            source: "registry".into(),
            name: "fs-server".into(),
            version: "1.2.0".into(),
            description: String::new(),
            source_ref: "npm:fs-server@1.2.0".into(),
            signals: CandidateSignals { capability_match: 1.0, quality: 1.0, recency: 1.0, source_trust: 1.0 },
        };
        assert_eq!(candidate.identity(), "fs-server@1.2.0");
    }
}
