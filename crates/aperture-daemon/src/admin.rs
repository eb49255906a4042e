//! The daemon's concrete binding of [`aperture_admin::AdminApi`] (spec §4.18,
//! §6 "Admin surface consumed by the core").
//!
//! No wire protocol is implemented here — per spec this surface is an
//! external collaborator's responsibility. This struct is the seam a
//! REST/WebSocket/CLI layer would wrap.

use std::sync::Arc;

use aperture_admin::{AdminApi, AdminError, AdminResult, ServerDetails, StopServerRequest, SystemStatus};
use aperture_config::ConfigHandle;
use aperture_core::{CapabilityName, DlqEntryId, JobId, ServerId};
use aperture_orchestrator::{AcquisitionRequest, JobSummary, Orchestrator};
use aperture_registry::{Registry, Router, Task};
use aperture_resilience::DeadLetterQueue;
use aperture_supervisor::Supervisor;
use aperture_variety::VarietyEngine;
use async_trait::async_trait;

/// Binds the admin surface over the daemon's live subsystems.
pub struct DaemonAdmin {
    orchestrator: Orchestrator,
    supervisor: Supervisor,
    registry: Arc<Registry>,
    router: Arc<Router>,
    variety: Arc<VarietyEngine>,
    dlq: Arc<DeadLetterQueue>,
    config_path: std::path::PathBuf,
    config: ConfigHandle,
}

impl DaemonAdmin {
    /// Build an admin surface over the daemon's already-constructed
    /// subsystems.
    #[must_use]
    pub fn new(
        orchestrator: Orchestrator,
        supervisor: Supervisor,
        registry: Arc<Registry>,
        router: Arc<Router>,
        variety: Arc<VarietyEngine>,
        dlq: Arc<DeadLetterQueue>,
        config_path: std::path::PathBuf,
        config: ConfigHandle,
    ) -> Self {
        Self { orchestrator, supervisor, registry, router, variety, dlq, config_path, config }
    }
}

#[async_trait]
impl AdminApi for DaemonAdmin {
    async fn system_status(&self) -> SystemStatus {
        SystemStatus {
            servers: self.registry.list_servers(),
            capability_count: self.registry.capability_count(),
            variety_history: self.variety.samples(),
            dlq: self.dlq.stats(),
        }
    }

    async fn job_status(&self, job_id: JobId) -> AdminResult<JobSummary> {
        self.orchestrator.status(job_id).ok_or(AdminError::UnknownJob(job_id))
    }

    async fn list_jobs(&self) -> Vec<JobSummary> {
        self.orchestrator.list()
    }

    async fn server_details(&self, server_id: ServerId) -> AdminResult<ServerDetails> {
        let process = self
            .supervisor
            .status(server_id)
            .ok_or(AdminError::Supervisor(aperture_supervisor::SupervisorError::NotFound(server_id)))?;
        let registered_capabilities: Vec<CapabilityName> = self
            .registry
            .list_servers()
            .into_iter()
            .find(|s| s.server_id == server_id)
            .map(|s| s.capabilities)
            .unwrap_or_default();
        Ok(ServerDetails { process, registered_capabilities })
    }

    async fn trigger_acquisition(&self, request: AcquisitionRequest) -> JobId {
        self.orchestrator.submit(request)
    }

    async fn stop_server(&self, request: StopServerRequest) -> AdminResult<()> {
        Ok(self.supervisor.stop(request.server_id, request.graceful).await?)
    }

    async fn restart_server(&self, server_id: ServerId) -> AdminResult<()> {
        Ok(self.supervisor.restart(server_id).await?)
    }

    async fn dlq_list(&self) -> Vec<aperture_resilience::DlqEntry> {
        self.dlq.list().await.unwrap_or_default()
    }

    async fn dlq_retry(&self, entry_id: DlqEntryId) -> AdminResult<()> {
        let router = Arc::clone(&self.router);
        self.dlq
            .retry::<AdminError, _, _>(entry_id, move |entry| async move {
                let task = Task::new(entry.capability, entry.method, entry.params);
                router.route(task).await.map(|_| ()).map_err(AdminError::from)
            })
            .await
    }

    async fn dlq_purge(&self, entry_id: DlqEntryId) -> AdminResult<()> {
        if self.dlq.list().await.unwrap_or_default().iter().all(|e| e.id != entry_id) {
            return Err(AdminError::UnknownDlqEntry(entry_id));
        }
        Ok(self.dlq.purge(entry_id).await.map_err(AdminError::from)?)
    }

    async fn reload_config(&self) -> AdminResult<()> {
        let config = aperture_config::loader::load(&self.config_path).map_err(|err| AdminError::ConfigReload(err.to_string()))?;
        drop(config);
        // The live `ConfigHandle` is refreshed by its own filesystem watcher
        // (spec §6 "Hot reload re-reads the file and applies diffs"); this
        // call's job is only to surface whether the file is currently valid,
        // matching the write method's "reload configuration" contract.
        let _ = self.config.get();
        Ok(())
    }
}
