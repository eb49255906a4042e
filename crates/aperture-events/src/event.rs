//! The [`ApertureEvent`] tagged union (spec §3.1).

use serde::{Deserialize, Serialize};

use aperture_core::{CapabilityName, JobId, ServerId, Timestamp};

/// State a circuit breaker transitioned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Calls pass through normally.
    Closed,
    /// Calls fail fast without reaching the target.
    Open,
    /// A single probe call is in flight.
    HalfOpen,
}

/// One acquisition-job phase (spec §4.16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPhase {
    /// Waiting to start; coalesced if another job for the capability is in-flight.
    Queued,
    /// Fanning out to catalog adapters.
    Discovering,
    /// Scoring and ordering candidates.
    Ranking,
    /// Running the Installer.
    Installing,
    /// Running the Sandbox & Verifier.
    Verifying,
    /// Promoting the installation to the Supervisor and Registry.
    Registering,
    /// Terminal success.
    Done,
    /// Terminal failure.
    Failed,
}

/// A lifecycle event broadcast on the daemon-wide event bus.
///
/// Observers (the admin surface, the audit log) subscribe without coupling the
/// publishing subsystem to them directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApertureEvent {
    /// A circuit breaker changed state.
    BreakerStateChanged {
        /// When the transition occurred.
        at: Timestamp,
        /// The server the breaker protects.
        server_id: ServerId,
        /// State before the transition.
        from: BreakerState,
        /// State after the transition.
        to: BreakerState,
    },
    /// A new Variety sample was pushed into the ring buffer.
    VarietySampleRecorded {
        /// When the sample was taken.
        at: Timestamp,
        /// Operational variety at sample time.
        operational: f64,
        /// Environmental variety at sample time.
        environmental: f64,
        /// `operational / environmental`.
        ratio: f64,
    },
    /// An acquisition job transitioned phase.
    JobPhaseChanged {
        /// When the transition occurred.
        at: Timestamp,
        /// The job that transitioned.
        job_id: JobId,
        /// The capability the job is acquiring.
        capability: CapabilityName,
        /// Phase before the transition.
        from: JobPhase,
        /// Phase after the transition.
        to: JobPhase,
    },
    /// A capability became routable (at least one `ready` server is bound).
    CapabilityRegistered {
        /// When registration occurred.
        at: Timestamp,
        /// The capability that became routable.
        capability: CapabilityName,
        /// The server that provides it.
        server_id: ServerId,
    },
    /// A capability lost its last `ready` server and is no longer routable.
    CapabilityUnregistered {
        /// When unregistration occurred.
        at: Timestamp,
        /// The capability that lost its binding.
        capability: CapabilityName,
        /// The server that was removed.
        server_id: ServerId,
    },
    /// A supervised server process changed lifecycle state.
    ServerProcessStateChanged {
        /// When the transition occurred.
        at: Timestamp,
        /// The server that transitioned.
        server_id: ServerId,
        /// Human-readable description of the new state, e.g. `"ready"`.
        state: String,
    },
}

impl ApertureEvent {
    /// A short, stable name for the event's variant, for logging and metrics tags.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::BreakerStateChanged { .. } => "breaker_state_changed",
            Self::VarietySampleRecorded { .. } => "variety_sample_recorded",
            Self::JobPhaseChanged { .. } => "job_phase_changed",
            Self::CapabilityRegistered { .. } => "capability_registered",
            Self::CapabilityUnregistered { .. } => "capability_unregistered",
            Self::ServerProcessStateChanged { .. } => "server_process_state_changed",
        }
    }
}
