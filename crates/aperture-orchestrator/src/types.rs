//! Job submission inputs, status snapshots, and pipeline tunables (spec §4.16).

use std::time::Duration;

use aperture_config::RestartPolicy;
use aperture_core::{CapabilityName, JobId, ServerId, Timestamp};
use aperture_events::JobPhase;
use serde::{Deserialize, Serialize};

/// Ordering hint carried by a submission; mirrors
/// [`aperture_variety::TriggerPriority`]'s shape without a cross-crate
/// dependency (this crate does not need the Variety Engine's internals,
/// only the idea of "a caller is blocked right now").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Ordinary acquisition.
    Normal,
    /// A caller is blocked right now; prefer this job when capacity is tight.
    High,
}

impl Default for Priority {
    fn default() -> Self {
        Self::Normal
    }
}

/// A request to acquire `capability`, submitted by the Variety Engine or the
/// admin surface's "trigger acquisition" write method (spec §4.18).
#[derive(Debug, Clone)]
pub struct AcquisitionRequest {
    /// The capability to acquire.
    pub capability: CapabilityName,
    /// Free-text keywords narrowing Discovery's search.
    pub keywords: Vec<String>,
    /// Ordering hint for capacity-constrained scheduling.
    pub priority: Priority,
    /// Restart policy applied to the server once registered.
    pub restart_policy: RestartPolicy,
}

impl AcquisitionRequest {
    /// Build a bare, normal-priority request for `capability`.
    #[must_use]
    pub fn new(capability: impl Into<CapabilityName>, restart_policy: RestartPolicy) -> Self {
        Self { capability: capability.into(), keywords: Vec::new(), priority: Priority::Normal, restart_policy }
    }

    /// Attach a priority hint.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Attach keywords.
    #[must_use]
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }
}

/// A read-only snapshot of one job's progress, for the admin surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSummary {
    /// Identifies the job.
    pub job_id: JobId,
    /// The capability being acquired.
    pub capability: CapabilityName,
    /// Current pipeline phase.
    pub phase: JobPhase,
    /// When the job was submitted.
    pub started_at: Timestamp,
    /// The server registered on success, once `registering` has committed.
    pub server_id: Option<ServerId>,
    /// The cause of the most recent failure, if the job is `failed`.
    pub last_error: Option<String>,
}

/// Per-phase wall-clock deadlines (spec §4.16 "Each phase has a wall-clock
/// deadline").
#[derive(Debug, Clone, Copy)]
pub struct PhaseDeadlines {
    /// Deadline for `discovering` + `ranking` combined (Discovery's own
    /// `discover` call covers both).
    pub discovery: Duration,
    /// Deadline for `installing`.
    pub installing: Duration,
    /// Deadline for `verifying`.
    pub verifying: Duration,
    /// Deadline for `registering`, the commit point. Not exposed on
    /// [`aperture_config::Config`] today (Open Question, resolved in
    /// `DESIGN.md`): registration is in-process bookkeeping, not I/O, so a
    /// short fixed ceiling catches a deadlocked Supervisor without needing an
    /// operator-tunable knob.
    pub registering: Duration,
}

impl Default for PhaseDeadlines {
    fn default() -> Self {
        Self {
            discovery: Duration::from_secs(8),
            installing: Duration::from_secs(120),
            verifying: Duration::from_secs(30),
            registering: Duration::from_secs(5),
        }
    }
}

impl From<&aperture_config::Config> for PhaseDeadlines {
    fn from(config: &aperture_config::Config) -> Self {
        Self {
            discovery: config.timeouts.discovery_deadline(),
            installing: config.timeouts.install_deadline(),
            verifying: config.timeouts.verify_deadline(),
            registering: PhaseDeadlines::default().registering,
        }
    }
}
