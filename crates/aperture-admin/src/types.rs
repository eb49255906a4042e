//! Typed request/response structs for the [`crate::AdminApi`] surface
//! (spec §6 "Admin surface", §4.18).

use aperture_core::ServerId;
use aperture_registry::RegisteredServer;
use aperture_resilience::DlqStats;
use aperture_supervisor::ServerProcessSummary;
use aperture_variety::VarietySample;
use serde::{Deserialize, Serialize};

/// A whole-daemon health snapshot: one phase/registry/variety/DLQ view in a
/// single call, so an operator does not need to stitch together several
/// reads (spec §6 "system status").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemStatus {
    /// Every currently-registered server, with its bound capabilities.
    pub servers: Vec<RegisteredServer>,
    /// Distinct capabilities currently routable.
    pub capability_count: usize,
    /// Most recent Variety Engine samples, oldest first.
    pub variety_history: Vec<VarietySample>,
    /// Current dead-letter queue depth and capacity.
    pub dlq: DlqStats,
}

/// What an admin caller sees for a single supervised server, beyond the
/// bare [`ServerProcessSummary`]: its bound capabilities from the Registry's
/// point of view, which may lag the Supervisor's own record briefly around
/// a state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerDetails {
    /// The Supervisor's view of this server's runtime state.
    pub process: ServerProcessSummary,
    /// The Registry's view of which capabilities currently route to it.
    pub registered_capabilities: Vec<aperture_core::CapabilityName>,
}

/// A request to stop a supervised server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StopServerRequest {
    /// The server to stop.
    pub server_id: ServerId,
    /// Whether to give the child its configured grace period before killing it.
    pub graceful: bool,
}
