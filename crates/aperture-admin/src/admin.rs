//! The `AdminApi` trait boundary (spec §4.18).

use aperture_core::{DlqEntryId, JobId, ServerId};
use aperture_orchestrator::{AcquisitionRequest, JobSummary};
use aperture_resilience::DlqEntry;
use async_trait::async_trait;

use crate::error::AdminResult;
use crate::types::{ServerDetails, StopServerRequest, SystemStatus};

/// The read/write operations the daemon exposes to an external driver (spec
/// §6 "Admin surface consumed by the core").
///
/// No HTTP/WS/CLI binding is implemented against this trait; it is the
/// in-process boundary a collaborator wires a wire protocol onto. The
/// daemon binds the real implementation over its own `Orchestrator`,
/// `Supervisor`, `Registry`, `VarietyEngine`, and DLQ at startup, the same
/// way [`aperture_registry::ServerSessionProvider`] is bound.
#[async_trait]
pub trait AdminApi: Send + Sync {
    /// A whole-daemon snapshot: registry shape, recent variety samples, DLQ
    /// depth.
    async fn system_status(&self) -> SystemStatus;

    /// The current state of one acquisition job.
    ///
    /// # Errors
    /// Returns [`crate::AdminError::UnknownJob`] if no such job exists.
    async fn job_status(&self, job_id: JobId) -> AdminResult<JobSummary>;

    /// Every acquisition job the Orchestrator currently knows about.
    async fn list_jobs(&self) -> Vec<JobSummary>;

    /// Details of one supervised server.
    ///
    /// # Errors
    /// Returns [`crate::AdminError::Supervisor`] wrapping `NotFound` if no
    /// such server exists.
    async fn server_details(&self, server_id: ServerId) -> AdminResult<ServerDetails>;

    /// Submit a new acquisition request, coalescing onto an in-flight job
    /// for the same capability if one already exists.
    async fn trigger_acquisition(&self, request: AcquisitionRequest) -> JobId;

    /// Stop a supervised server.
    ///
    /// # Errors
    /// Returns [`crate::AdminError::Supervisor`] if the server is unknown or
    /// fails to stop within its grace period.
    async fn stop_server(&self, request: StopServerRequest) -> AdminResult<()>;

    /// Restart a supervised server in place.
    ///
    /// # Errors
    /// Returns [`crate::AdminError::Supervisor`] if the server is unknown or
    /// the respawn fails.
    async fn restart_server(&self, server_id: ServerId) -> AdminResult<()>;

    /// Every entry currently held in the dead-letter queue.
    async fn dlq_list(&self) -> Vec<DlqEntry>;

    /// Re-execute a dead-lettered call through the normal Router path,
    /// removing it from the queue on success.
    ///
    /// # Errors
    /// Returns [`crate::AdminError::UnknownDlqEntry`] if `entry_id` is not
    /// in the queue, or [`crate::AdminError::Resilience`] if the retried
    /// call itself failed.
    async fn dlq_retry(&self, entry_id: DlqEntryId) -> AdminResult<()>;

    /// Discard a dead-lettered entry without replaying it.
    ///
    /// # Errors
    /// Returns [`crate::AdminError::UnknownDlqEntry`] if `entry_id` is not
    /// in the queue.
    async fn dlq_purge(&self, entry_id: DlqEntryId) -> AdminResult<()>;

    /// Re-read the configuration file and apply any diffs without
    /// restarting supervised children.
    ///
    /// # Errors
    /// Returns [`crate::AdminError::ConfigReload`] if the file cannot be
    /// read or fails validation.
    async fn reload_config(&self) -> AdminResult<()>;
}
