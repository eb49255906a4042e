//! The `CatalogAdapter` interface and an HTTP-backed implementation
//! (spec §4.10, §6 "Catalog adapters").

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::error::{DiscoveryError, DiscoveryResult};
use crate::types::{CandidateSignals, DiscoveryQuery, ServerCandidate};

/// A read-only source of [`ServerCandidate`]s.
///
/// The engine depends only on this trait; concrete sources (an HTTP
/// registry, a local directory of manifests, a test double) are selected by
/// configuration at startup, never by runtime type inspection (spec §9).
#[async_trait]
pub trait CatalogAdapter: Send + Sync {
    /// A short tag identifying this source, copied into every candidate it returns.
    fn source_name(&self) -> &str;

    /// Query this catalog for candidates matching `query`.
    ///
    /// # Errors
    /// Returns [`DiscoveryError::AdapterFailed`] if the catalog could not be
    /// reached or returned a malformed payload. An empty result is not an
    /// error.
    async fn query(&self, query: &DiscoveryQuery) -> DiscoveryResult<Vec<ServerCandidate>>;
}

#[derive(serde::Deserialize)]
struct CatalogEntry {
    name: String,
    version: String,
    source_ref: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    quality: f64,
    #[serde(default)]
    recency: f64,
    #[serde(default)]
    source_trust: f64,
}

#[derive(serde::Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    entries: Vec<CatalogEntry>,
}

/// A catalog adapter backed by a plain HTTP endpoint: `GET {base_url}?capability=...&keywords=...`
/// returning `{"entries": [...]}`.
pub struct HttpCatalogAdapter {
    source: String,
    base_url: String,
    client: Client,
}

impl HttpCatalogAdapter {
    /// Build an adapter tagged `source` querying `base_url`.
    #[must_use]
    pub fn new(source: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self { source: source.into(), base_url: base_url.into(), client: Client::new() }
    }
}

#[async_trait]
impl CatalogAdapter for HttpCatalogAdapter {
    fn source_name(&self) -> &str {
        &self.source
    }

    async fn query(&self, query: &DiscoveryQuery) -> DiscoveryResult<Vec<ServerCandidate>> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("capability", query.capability.as_str())])
            .query(&[("keywords", query.keywords.join(","))])
            .send()
            .await
            .map_err(|e| adapter_error(&self.source, &e.to_string()))?;

        if !response.status().is_success() {
            return Err(adapter_error(&self.source, &format!("catalog returned {}", response.status())));
        }

        let body: CatalogResponse =
            response.json().await.map_err(|e| adapter_error(&self.source, &e.to_string()))?;

        debug!(source = %self.source, count = body.entries.len(), "catalog query returned candidates");

        Ok(body
            .entries
            .into_iter()
            .map(|entry| ServerCandidate {
                source: self.source.clone(),
                name: entry.name,
                version: entry.version,
                description: entry.description,
                source_ref: entry.source_ref,
                signals: CandidateSignals {
                    capability_match: 1.0,
                    quality: entry.quality.clamp(0.0, 1.0),
                    recency: entry.recency.clamp(0.0, 1.0),
                    source_trust: entry.source_trust.clamp(0.0, 1.0),
                },
            })
            .collect())
    }
}

fn adapter_error(source: &str, message: &str) -> DiscoveryError {
    DiscoveryError::AdapterFailed { source: source.to_string(), message: message.to_string() }
}
