//! Samples, triggers, and the operational-variety source seam (spec §4.15).

use aperture_core::{CapabilityName, Timestamp};
use serde::{Deserialize, Serialize};

/// One point in the Variety Engine's ring buffer (spec §3 `VarietySample`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VarietySample {
    /// When the sample was taken.
    pub at: Timestamp,
    /// Operational variety at sample time.
    pub operational: f64,
    /// Environmental variety at sample time.
    pub environmental: f64,
    /// `operational / environmental`.
    pub ratio: f64,
}

/// Why a trigger fired (spec §4.15).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerReason {
    /// `ratio < low_watermark` sustained for the configured number of samples.
    LowRatio,
    /// A task requested a capability with no bound server.
    UnavailableCapabilityRequested,
    /// A capability saw a prolonged streak of routing failures.
    RoutingFailureStreak,
}

/// Coarse ordering hint the Orchestrator may use when several triggers are
/// queued at once. Not a hard priority queue — a cheap nudge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerPriority {
    /// Ordinary acquisition.
    Normal,
    /// Fire ahead of normal-priority triggers: a caller is blocked right now.
    High,
}

/// An acquisition trigger emitted by the Variety Engine. Deduplicated and
/// coalesced by `capability` (spec §4.15) — see [`crate::engine::VarietyEngine`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarietyTrigger {
    /// The capability this trigger proposes acquiring more of.
    pub capability: CapabilityName,
    /// What caused this trigger to fire.
    pub reason: TriggerReason,
    /// How large the gap was judged to be, in the same units as `ratio`.
    pub shortfall: f64,
    /// Ordering hint for the Orchestrator's intake queue.
    pub priority: TriggerPriority,
    /// When the trigger fired.
    pub at: Timestamp,
}

/// A read-only snapshot of the Registry's current shape, the raw material
/// for `operational_variety` (spec §4.15).
#[derive(Debug, Clone, Copy, Default)]
pub struct OperationalSnapshot {
    /// Distinct capabilities currently routable.
    pub capability_count: usize,
    /// Distinct servers currently registered.
    pub server_count: usize,
    /// Total tools advertised across every registered server.
    pub tool_count: usize,
}

/// Supplies the Variety Engine with a fresh [`OperationalSnapshot`] on each
/// tick, without the engine depending on whichever crate owns the Registry
/// (the same dependency-inversion seam as `ServerSessionProvider` and
/// `Reinstaller` elsewhere in this workspace).
pub trait OperationalVarietySource: Send + Sync {
    /// Take a snapshot of the Registry's current shape.
    fn snapshot(&self) -> OperationalSnapshot;
}
