//! The `AcquisitionJob` pipeline runner (spec §4.16).
//!
//! [`Orchestrator::submit`] is the sole entry point: it coalesces concurrent
//! requests for the same capability onto a single job and drives that job
//! through `discovering -> ranking -> installing -> verifying ->
//! registering -> done`/`failed`, publishing a
//! [`aperture_events::ApertureEvent::JobPhaseChanged`] at every transition.

use std::sync::Arc;

use aperture_audit::{AuditLog, DiagnosticEvent};
use aperture_config::{Config, ConfigHandle};
use aperture_core::{CapabilityName, JobId, ServerId, Timestamp};
use aperture_discovery::{DiscoveryEngine, DiscoveryQuery};
use aperture_events::{ApertureEvent, EventBus, JobPhase};
use aperture_installer::{InstallRequest, Installation, Installer};
use aperture_oracle::{AdvisoryOracle, OracleConfig};
use aperture_registry::Registry;
use aperture_sandbox::{Sandbox, VerificationVerdict};
use aperture_supervisor::{HealthCheckStrategy, StartSpec, Supervisor};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{info, warn};

use crate::error::{OrchestratorError, OrchestratorResult, Phase};
use crate::job::AcquisitionJob;
use crate::probes::ProbeCatalog;
use crate::types::{AcquisitionRequest, JobSummary, PhaseDeadlines};

struct Inner {
    config: ConfigHandle,
    events: EventBus,
    audit: Arc<AuditLog>,
    discovery: Arc<DiscoveryEngine>,
    installer: Arc<Installer>,
    sandbox: Arc<Sandbox>,
    supervisor: Supervisor,
    registry: Arc<Registry>,
    oracle: Option<Arc<dyn AdvisoryOracle>>,
    oracle_config: OracleConfig,
    probes: Arc<dyn ProbeCatalog>,
    jobs: DashMap<JobId, Arc<AcquisitionJob>>,
    active_by_capability: DashMap<CapabilityName, JobId>,
}

/// Drives every `AcquisitionJob` from submission to its terminal phase.
///
/// Cheap to clone: internals are `Arc`-shared, the same pattern
/// [`aperture_supervisor::Supervisor`] and [`aperture_mcp::McpClient`] use.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<Inner>,
}

/// Everything the Orchestrator needs to drive a job to completion, collected
/// once at daemon startup (spec §9 "the daemon binary wires subsystems
/// together, no subsystem constructs another").
pub struct OrchestratorDeps {
    /// Hot-reloading configuration handle.
    pub config: ConfigHandle,
    /// The daemon-wide event bus.
    pub events: EventBus,
    /// The append-only diagnostic log.
    pub audit: Arc<AuditLog>,
    /// Catalog fan-out and ranking.
    pub discovery: Arc<DiscoveryEngine>,
    /// Fetch-and-build pipeline.
    pub installer: Arc<Installer>,
    /// Isolated verification pipeline.
    pub sandbox: Arc<Sandbox>,
    /// Owns every live supervised server.
    pub supervisor: Supervisor,
    /// Capability-to-server bindings.
    pub registry: Arc<Registry>,
    /// An optional advisory scoring source (spec §4.17).
    pub oracle: Option<Arc<dyn AdvisoryOracle>>,
    /// Blending tunables for `oracle`; a `None` oracle ignores this.
    pub oracle_config: OracleConfig,
    /// Supplies per-capability verification probes.
    pub probes: Arc<dyn ProbeCatalog>,
}

impl Orchestrator {
    /// Build an orchestrator over its collaborators.
    #[must_use]
    pub fn new(deps: OrchestratorDeps) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: deps.config,
                events: deps.events,
                audit: deps.audit,
                discovery: deps.discovery,
                installer: deps.installer,
                sandbox: deps.sandbox,
                supervisor: deps.supervisor,
                registry: deps.registry,
                oracle: deps.oracle,
                oracle_config: deps.oracle_config,
                probes: deps.probes,
                jobs: DashMap::new(),
                active_by_capability: DashMap::new(),
            }),
        }
    }

    /// Submit a request to acquire `request.capability`.
    ///
    /// If a job for this capability is already running (`discovering`
    /// through `registering`), its `JobId` is returned instead of starting a
    /// second one (spec §4.16 "at most one job per capability").
    pub fn submit(&self, request: AcquisitionRequest) -> JobId {
        match self.inner.active_by_capability.entry(request.capability.clone()) {
            Entry::Occupied(entry) => {
                let job_id = *entry.get();
                info!(capability = %request.capability, %job_id, "acquisition request coalesced onto in-flight job");
                job_id
            }
            Entry::Vacant(vacant) => {
                let job = Arc::new(AcquisitionJob::new(JobId::new(), request.capability.clone()));
                let job_id = job.job_id;
                vacant.insert(job_id);
                self.inner.jobs.insert(job_id, Arc::clone(&job));

                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    inner.run(job, request).await;
                });
                job_id
            }
        }
    }

    /// A read-only snapshot of one job's progress.
    #[must_use]
    pub fn status(&self, job_id: JobId) -> Option<JobSummary> {
        self.inner.jobs.get(&job_id).map(|j| j.summary())
    }

    /// A snapshot of every job this orchestrator has ever run, in no
    /// particular order.
    #[must_use]
    pub fn list(&self) -> Vec<JobSummary> {
        self.inner.jobs.iter().map(|entry| entry.value().summary()).collect()
    }

    /// Cancel a job still in `installing` or `verifying`.
    ///
    /// # Errors
    /// Returns [`OrchestratorError::UnknownJob`] if no job exists with this
    /// id, or [`OrchestratorError::AlreadyCommitted`] once it has reached
    /// `registering` or a terminal phase.
    pub fn cancel(&self, job_id: JobId) -> OrchestratorResult<()> {
        let job = self.inner.jobs.get(&job_id).map(|j| Arc::clone(j.value())).ok_or(OrchestratorError::UnknownJob)?;
        match job.phase() {
            JobPhase::Installing | JobPhase::Verifying => {
                job.cancel.cancel();
                Ok(())
            }
            _ => Err(OrchestratorError::AlreadyCommitted),
        }
    }
}

impl Inner {
    async fn run(&self, job: Arc<AcquisitionJob>, request: AcquisitionRequest) {
        let config = self.config.get();
        let deadlines = PhaseDeadlines::from(&config);

        match self.run_pipeline(&job, &request, &config, &deadlines).await {
            Ok(server_id) => {
                *job.server_id.lock() = Some(server_id);
                self.set_phase(&job, JobPhase::Done);
                self.audit_success(&job, server_id).await;
            }
            Err(err) => {
                *job.last_error.lock() = Some(err.to_string());
                let phase = job.phase();
                self.set_phase(&job, JobPhase::Failed);
                self.audit_failure(&job, phase, &err).await;
            }
        }

        self.active_by_capability.remove(&request.capability);
    }

    async fn run_pipeline(
        &self,
        job: &AcquisitionJob,
        request: &AcquisitionRequest,
        config: &Config,
        deadlines: &PhaseDeadlines,
    ) -> OrchestratorResult<ServerId> {
        self.set_phase(job, JobPhase::Discovering);
        let query = DiscoveryQuery::for_capability(request.capability.clone()).with_keywords(request.keywords.clone());
        // `discover` already bounds itself to `config.timeouts.discovery_deadline()`,
        // the same duration as `deadlines.discovery`; no second timeout wrapper needed.
        let ranked = match self.discovery.discover(&query, config).await {
            Ok(ranked) => ranked,
            Err(aperture_discovery::DiscoveryError::DeadlineElapsed { .. }) => {
                return Err(OrchestratorError::DeadlineExceeded(Phase::Discovering.label()));
            }
            Err(_) => return Err(OrchestratorError::NoCandidates(request.capability.clone())),
        };

        self.set_phase(job, JobPhase::Ranking);
        let ranked = aperture_oracle::consult(ranked, self.oracle.as_deref(), &self.oracle_config).await;
        let Some(top) = ranked.into_iter().next() else {
            return Err(OrchestratorError::NoCandidates(request.capability.clone()));
        };
        let candidate = top.candidate;

        self.set_phase(job, JobPhase::Installing);
        let install_request = InstallRequest::new(candidate.name.clone(), candidate.version.clone(), candidate.source_ref.clone())
            .map_err(|e| OrchestratorError::InstallFailed(e.to_string()))?;

        let installation = tokio::select! {
            () = job.cancel.cancelled() => return Err(OrchestratorError::Cancelled(Phase::Installing.label())),
            result = tokio::time::timeout(deadlines.installing, self.installer.install(install_request, true)) => {
                match result {
                    Ok(Ok(installation)) => installation,
                    Ok(Err(e)) => return Err(OrchestratorError::InstallFailed(e.to_string())),
                    Err(_elapsed) => return Err(OrchestratorError::DeadlineExceeded(Phase::Installing.label())),
                }
            }
        };

        self.set_phase(job, JobPhase::Verifying);
        let probes = self.probes.probes_for(&request.capability);
        let verdict = tokio::select! {
            () = job.cancel.cancelled() => {
                self.rollback_install(&installation);
                return Err(OrchestratorError::Cancelled(Phase::Verifying.label()));
            }
            result = tokio::time::timeout(deadlines.verifying, self.sandbox.verify(&installation, &probes)) => {
                match result {
                    Ok(Ok(verdict)) => verdict,
                    Ok(Err(e)) => {
                        self.rollback_install(&installation);
                        return Err(OrchestratorError::VerifyFailed(e.to_string()));
                    }
                    Err(_elapsed) => {
                        self.rollback_install(&installation);
                        return Err(OrchestratorError::DeadlineExceeded(Phase::Verifying.label()));
                    }
                }
            }
        };

        if !verdict.passed {
            self.rollback_install(&installation);
            return Err(OrchestratorError::VerifyFailed("verification verdict did not pass".to_string()));
        }

        self.set_phase(job, JobPhase::Registering);
        match tokio::time::timeout(deadlines.registering, self.register(request, &installation, &verdict)).await {
            Ok(Ok(server_id)) => Ok(server_id),
            Ok(Err(e)) => Err(e),
            Err(_elapsed) => Err(OrchestratorError::DeadlineExceeded(Phase::Registering.label())),
        }
    }

    /// Promote a verified installation: start the Supervisor's child, then
    /// publish the Registry binding. Nothing upstream of this call has made
    /// the capability visible, so a failure here leaves no partial state
    /// (spec §4.16 "commit point... no partial visibility").
    async fn register(
        &self,
        request: &AcquisitionRequest,
        installation: &Installation,
        verdict: &VerificationVerdict,
    ) -> OrchestratorResult<ServerId> {
        let start_spec = StartSpec {
            installation: installation.clone(),
            capabilities: vec![request.capability.clone()],
            restart_policy: request.restart_policy,
            health_check: HealthCheckStrategy::Protocol,
        };
        let server_id =
            self.supervisor.start(start_spec).await.map_err(|e| OrchestratorError::RegisterFailed(e.to_string()))?;
        self.registry.register(server_id, vec![request.capability.clone()], verdict.tool_descriptors.clone());
        Ok(server_id)
    }

    fn rollback_install(&self, installation: &Installation) {
        if let Err(err) = self.installer.remove(installation) {
            warn!(install_id = %installation.install_id, error = %err, "failed to roll back cancelled/failed installation");
        }
    }

    fn set_phase(&self, job: &AcquisitionJob, new_phase: JobPhase) {
        let from = {
            let mut guard = job.phase.lock();
            let from = *guard;
            *guard = new_phase;
            from
        };
        self.events.publish(ApertureEvent::JobPhaseChanged {
            at: Timestamp::now(),
            job_id: job.job_id,
            capability: job.capability.clone(),
            from,
            to: new_phase,
        });
    }

    async fn audit_success(&self, job: &AcquisitionJob, server_id: ServerId) {
        let event = DiagnosticEvent::AcquisitionSucceeded {
            job_id: job.job_id,
            capability: job.capability.to_string(),
            server_id,
        };
        if let Err(err) = self.audit.append(event).await {
            warn!(job_id = %job.job_id, error = %err, "failed to append acquisition-succeeded diagnostic record");
        }
    }

    async fn audit_failure(&self, job: &AcquisitionJob, phase: JobPhase, err: &OrchestratorError) {
        let event = DiagnosticEvent::AcquisitionFailed {
            job_id: job.job_id,
            capability: job.capability.to_string(),
            phase: phase_label(phase).to_string(),
            error_kind: format!("{:?}", err.kind()),
            cause: err.to_string(),
        };
        if let Err(err) = self.audit.append(event).await {
            warn!(job_id = %job.job_id, error = %err, "failed to append acquisition-failed diagnostic record");
        }
    }
}

fn phase_label(phase: JobPhase) -> &'static str {
    match phase {
        JobPhase::Queued => "queued",
        JobPhase::Discovering => "discovering",
        JobPhase::Ranking => "ranking",
        JobPhase::Installing => "installing",
        JobPhase::Verifying => "verifying",
        JobPhase::Registering => "registering",
        JobPhase::Done => "done",
        JobPhase::Failed => "failed",
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use aperture_config::RestartPolicy;
    use aperture_core::ErrorKind;
    use aperture_discovery::{DiscoveryError, DiscoveryResult, ServerCandidate};
    use aperture_sandbox::SandboxLimits;
    use aperture_storage::MemoryKvStore;
    use async_trait::async_trait;

    use super::*;
    use crate::probes::NoProbes;

    struct EmptyAdapter;

    #[async_trait]
    impl aperture_discovery::CatalogAdapter for EmptyAdapter {
        fn source_name(&self) -> &str {
            "empty"
        }

        async fn query(&self, _query: &DiscoveryQuery) -> DiscoveryResult<Vec<ServerCandidate>> {
            Err(DiscoveryError::AdapterFailed { source: "empty".into(), message: "no catalogs configured in test".into() })
        }
    }

    async fn test_orchestrator() -> Orchestrator {
        let store: Arc<dyn aperture_storage::KvStore> = Arc::new(MemoryKvStore::new());
        let audit = Arc::new(AuditLog::open(store).await.unwrap());
        let events = EventBus::new();
        let config_file = tempfile::NamedTempFile::new().unwrap();
        let config_handle = aperture_config::load_and_watch(config_file.path()).unwrap();

        let discovery = Arc::new(DiscoveryEngine::new(vec![Arc::new(EmptyAdapter)]));
        let dir = tempfile::tempdir().unwrap();
        let installer = Arc::new(Installer::new(dir.path().to_path_buf(), Duration::from_secs(5), aperture_installer::InstallPolicy::default()));
        let sandbox = Arc::new(Sandbox::new(SandboxLimits {
            memory_mb: 256,
            cpu_percent: 100,
            allow_network: false,
            wall_clock_timeout: Duration::from_secs(5),
            call_timeout: Duration::from_secs(2),
        }));
        let supervisor = Supervisor::new(aperture_supervisor::SupervisorConfig::default(), events.clone(), Arc::clone(&audit));
        let registry = Arc::new(Registry::new(events.clone()));

        Orchestrator::new(OrchestratorDeps {
            config: config_handle,
            events,
            audit,
            discovery,
            installer,
            sandbox,
            supervisor,
            registry,
            oracle: None,
            oracle_config: OracleConfig::default(),
            probes: Arc::new(NoProbes),
        })
    }

    #[tokio::test]
    async fn unavailable_error_maps_to_capability_unavailable_kind() {
        let err = OrchestratorError::NoCandidates(CapabilityName::new("filesystem"));
        assert_eq!(err.kind(), ErrorKind::CapabilityUnavailable);
    }

    #[tokio::test]
    async fn job_with_no_catalog_candidates_fails_and_is_visible_in_status() {
        let orchestrator = test_orchestrator().await;
        let job_id = orchestrator.submit(AcquisitionRequest::new(CapabilityName::new("filesystem"), RestartPolicy::Transient));

        for _ in 0..200 {
            if matches!(orchestrator.status(job_id).map(|s| s.phase), Some(JobPhase::Failed)) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let summary = orchestrator.status(job_id).unwrap();
        assert_eq!(summary.phase, JobPhase::Failed);
        assert!(summary.last_error.is_some());
    }

    #[tokio::test]
    async fn a_second_submission_for_the_same_capability_coalesces() {
        let orchestrator = test_orchestrator().await;
        let capability = CapabilityName::new("filesystem");
        let first = orchestrator.submit(AcquisitionRequest::new(capability.clone(), RestartPolicy::Transient));
        let second = orchestrator.submit(AcquisitionRequest::new(capability, RestartPolicy::Transient));
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn cancel_on_an_unknown_job_is_an_error() {
        let orchestrator = test_orchestrator().await;
        let err = orchestrator.cancel(JobId::new()).unwrap_err();
        assert!(matches!(err, OrchestratorError::UnknownJob));
    }
}
