//! The mutable runtime state of one in-flight acquisition (spec §4.16).

use aperture_core::{CapabilityName, JobId, ServerId, Timestamp};
use aperture_events::JobPhase;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::types::JobSummary;

/// One `AcquisitionJob`, owned exclusively by the [`crate::orchestrator::Orchestrator`].
///
/// Mirrors the shape of [`aperture_supervisor`]'s `ManagedProcess`: a fixed
/// identity plus a handful of `parking_lot`-guarded fields that change as the
/// pipeline advances, so a `status()` caller never blocks behind a running
/// phase.
pub struct AcquisitionJob {
    pub(crate) job_id: JobId,
    pub(crate) capability: CapabilityName,
    pub(crate) started_at: Timestamp,
    pub(crate) phase: Mutex<JobPhase>,
    pub(crate) server_id: Mutex<Option<ServerId>>,
    pub(crate) last_error: Mutex<Option<String>>,
    pub(crate) cancel: CancellationToken,
}

impl AcquisitionJob {
    pub(crate) fn new(job_id: JobId, capability: CapabilityName) -> Self {
        Self {
            job_id,
            capability,
            started_at: Timestamp::now(),
            phase: Mutex::new(JobPhase::Queued),
            server_id: Mutex::new(None),
            last_error: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn phase(&self) -> JobPhase {
        *self.phase.lock()
    }

    /// A read-only snapshot suitable for the admin surface.
    #[must_use]
    pub fn summary(&self) -> JobSummary {
        JobSummary {
            job_id: self.job_id,
            capability: self.capability.clone(),
            phase: self.phase(),
            started_at: self.started_at,
            server_id: *self.server_id.lock(),
            last_error: self.last_error.lock().clone(),
        }
    }
}
