//! Supervised process state, health-check strategy, and resource accounting
//! (spec §3 `ServerProcess`, §4.13).

use std::sync::Arc;

use aperture_core::{CapabilityName, InstallId, ServerId, Timestamp};
use aperture_mcp::McpClient;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use aperture_config::RestartPolicy;

/// Lifecycle state of one supervised external server (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerState {
    /// The child has been spawned; the `initialize` handshake has not completed.
    Starting,
    /// The handshake completed and the server accepts calls.
    Ready,
    /// The server is reachable but has missed at least one health check.
    Degraded,
    /// A graceful stop is in progress.
    Stopping,
    /// The child has exited and will not be restarted.
    Stopped,
    /// The escalation ladder was exhausted; the server requires operator attention.
    Failed,
}

impl ServerState {
    /// A short label used in [`aperture_events::ApertureEvent::ServerProcessStateChanged`].
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Degraded => "degraded",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Failed => "failed",
        }
    }
}

/// How the Supervisor decides a child is still healthy (spec §4.13).
#[derive(Clone)]
pub enum HealthCheckStrategy {
    /// The transport-level session is still `ready`; cheapest check.
    Liveness,
    /// A full `tools/list` round trip must succeed.
    Protocol,
    /// An operator-supplied probe, for servers with a bespoke health endpoint.
    Custom(Arc<dyn HealthProbe>),
}

/// A caller-supplied health probe for [`HealthCheckStrategy::Custom`].
#[async_trait]
pub trait HealthProbe: Send + Sync {
    /// Return `true` if `client` is healthy.
    async fn probe(&self, client: &McpClient) -> bool;
}

/// Resource ceilings enforced per child (spec §4.13 "Resource accounting").
///
/// Not part of [`aperture_config::Config`] (which only carries the Sandbox's
/// one-shot verification ceilings) since these apply continuously to a
/// long-lived process rather than a bounded verification run.
#[derive(Debug, Clone, Copy)]
pub struct ResourceLimits {
    /// RSS above which a warning is logged and an `ApertureEvent` published.
    pub soft_rss_kb: u64,
    /// RSS above which the child is restarted gracefully.
    pub hard_rss_kb: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self { soft_rss_kb: 256 * 1024, hard_rss_kb: 512 * 1024 }
    }
}

/// A point-in-time resource observation for one child.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// Resident set size, in kilobytes, if it could be sampled.
    pub rss_kb: Option<u64>,
}

/// A read-only snapshot of one supervised server, for the Registry and the
/// admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerProcessSummary {
    /// Identifies the server.
    pub server_id: ServerId,
    /// The installation backing this server.
    pub install_id: InstallId,
    /// Capabilities this server was registered to provide.
    pub capabilities: Vec<CapabilityName>,
    /// Current lifecycle state.
    pub state: ServerState,
    /// Restart policy applied to this server.
    pub restart_policy: RestartPolicy,
    /// Number of restarts since this server was first started.
    pub restart_count: u32,
    /// When the last health check (of any kind) last succeeded.
    pub last_health_at: Option<Timestamp>,
    /// Most recent resource sample.
    pub resource: ResourceUsage,
}

/// Everything the Supervisor needs to start (or restart) one server.
#[derive(Clone)]
pub struct StartSpec {
    /// The installation to launch.
    pub installation: aperture_installer::Installation,
    /// Capabilities this server will provide once registered.
    pub capabilities: Vec<CapabilityName>,
    /// Restart policy to apply on unexpected exit.
    pub restart_policy: RestartPolicy,
    /// Health-check strategy used for this server's monitor loop.
    pub health_check: HealthCheckStrategy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_state_has_a_distinct_label() {
        let labels: Vec<&str> = [
            ServerState::Starting,
            ServerState::Ready,
            ServerState::Degraded,
            ServerState::Stopping,
            ServerState::Stopped,
            ServerState::Failed,
        ]
        .into_iter()
        .map(ServerState::label)
        .collect();
        let mut deduped = labels.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(labels.len(), deduped.len());
    }

    #[test]
    fn default_resource_limits_keep_soft_below_hard() {
        let limits = ResourceLimits::default();
        assert!(limits.soft_rss_kb < limits.hard_rss_kb);
    }
}
