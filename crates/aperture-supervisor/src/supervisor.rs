//! Owns every supervised external server: spawn, restart policy, health
//! monitoring, and the failure escalation ladder (spec §4.13).

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use aperture_audit::{AuditLog, DiagnosticEvent};
use aperture_core::{ServerId, Timestamp, backoff_delay};
use aperture_events::{ApertureEvent, EventBus};
use aperture_installer::{Installation, LaunchSpec};
use aperture_mcp::{ClientCapabilities, McpClient};
use aperture_transport::Transport;
use async_trait::async_trait;
use dashmap::DashMap;
use tokio::process::{Child, Command};
use tracing::{info, warn};

use crate::error::{SupervisorError, SupervisorResult};
use crate::process::{ManagedProcess, RuntimeHandle};
use crate::types::{
    HealthCheckStrategy, ResourceLimits, ResourceUsage, ServerProcessSummary, ServerState, StartSpec,
};

/// Supervisor tunables, derived once at startup from [`aperture_config::Config`].
#[derive(Debug, Clone, Copy)]
pub struct SupervisorConfig {
    /// Maximum number of concurrently-supervised children.
    pub max_children: usize,
    /// Deadline for the `initialize` handshake after spawn.
    pub init_timeout: Duration,
    /// Deadline for an individual health probe.
    pub health_probe_timeout: Duration,
    /// Interval between health-check ticks.
    pub health_interval: Duration,
    /// Grace period given to a child on graceful stop before it is killed.
    pub stop_grace: Duration,
    /// Restart backoff ceiling.
    pub max_backoff: Duration,
    /// Sustained-healthy interval after which restart backoff resets.
    pub backoff_reset: Duration,
    /// RSS ceilings enforced on every supervised child.
    pub resource_limits: ResourceLimits,
}

impl From<&aperture_config::Config> for SupervisorConfig {
    fn from(config: &aperture_config::Config) -> Self {
        Self {
            max_children: config.limits.max_children,
            init_timeout: config.timeouts.init_timeout(),
            health_probe_timeout: Duration::from_millis(config.timeouts.health_probe_timeout_ms),
            health_interval: config.timeouts.health_interval(),
            stop_grace: config.timeouts.stop_grace(),
            max_backoff: Duration::from_millis(config.thresholds.supervisor_max_backoff_ms),
            backoff_reset: Duration::from_millis(config.thresholds.supervisor_backoff_reset_ms),
            resource_limits: ResourceLimits::default(),
        }
    }
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self::from(&aperture_config::Config::default())
    }
}

/// Re-fetches and rebuilds an [`Installation`] for escalation rung 4
/// ("full reinstall-and-restart", spec §4.13).
///
/// A trait rather than a direct `aperture-installer` dependency on a
/// concrete install pipeline, so the Supervisor never needs to know about
/// Discovery or ranking: the daemon binary wires the real Installer in at
/// startup (spec §9 "cyclic references... key to opaque ids, others hold
/// read-only snapshots").
#[async_trait]
pub trait Reinstaller: Send + Sync {
    /// Produce a fresh [`Installation`] for the same logical server.
    async fn reinstall(&self, current: &Installation) -> Result<Installation, String>;
}

struct Inner {
    config: SupervisorConfig,
    events: EventBus,
    audit: Arc<AuditLog>,
    reinstaller: Option<Arc<dyn Reinstaller>>,
    processes: DashMap<ServerId, Arc<ManagedProcess>>,
}

/// Owns every live `ServerProcess`. Cheap to clone: internals are
/// `Arc`-shared, following the same pattern as [`aperture_mcp::McpClient`].
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    /// Build a supervisor with no reinstaller configured; escalation rung 4
    /// is skipped and the ladder proceeds straight to `mark_failed`.
    #[must_use]
    pub fn new(config: SupervisorConfig, events: EventBus, audit: Arc<AuditLog>) -> Self {
        Self::with_reinstaller(config, events, audit, None)
    }

    /// Build a supervisor with a [`Reinstaller`] wired in for escalation rung 4.
    #[must_use]
    pub fn with_reinstaller(
        config: SupervisorConfig,
        events: EventBus,
        audit: Arc<AuditLog>,
        reinstaller: Option<Arc<dyn Reinstaller>>,
    ) -> Self {
        Self { inner: Arc::new(Inner { config, events, audit, reinstaller, processes: DashMap::new() }) }
    }

    /// Number of servers currently supervised, in any state.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.processes.len()
    }

    /// Whether no servers are currently supervised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn `spec.installation` as a new managed child and run it through
    /// the `initialize`/`tools/list` handshake.
    ///
    /// # Errors
    /// Returns [`SupervisorError::CapacityExhausted`] if `max_children` is
    /// already reached, [`SupervisorError::SpawnFailed`] if the process
    /// could not be spawned, or [`SupervisorError::Handshake`] if the
    /// protocol handshake failed.
    pub async fn start(&self, spec: StartSpec) -> SupervisorResult<ServerId> {
        if self.inner.processes.len() >= self.inner.config.max_children {
            return Err(SupervisorError::CapacityExhausted);
        }

        let server_id = ServerId::new();
        let runtime = self.spawn_runtime(server_id, &spec.installation).await?;
        let process = ManagedProcess::new(
            server_id,
            spec.capabilities,
            spec.restart_policy,
            spec.health_check,
            runtime,
        );
        self.inner.processes.insert(server_id, Arc::clone(&process));
        process.set_state(ServerState::Ready);
        process.record_health_success();
        self.publish_state(server_id, ServerState::Ready);

        let inner = Arc::clone(&self.inner);
        let cancel = process.cancel.clone();
        tokio::spawn(async move {
            health_loop(inner, server_id, cancel).await;
        });

        Ok(server_id)
    }

    async fn spawn_runtime(&self, server_id: ServerId, installation: &Installation) -> SupervisorResult<RuntimeHandle> {
        let mut child = spawn_child(&installation.launch_spec)
            .map_err(|e| SupervisorError::SpawnFailed(e.to_string()))?;
        let transport: Arc<dyn Transport> = Arc::new(
            aperture_transport::stdio::open(&mut child)
                .map_err(|e| SupervisorError::SpawnFailed(e.to_string()))?,
        );
        let client = McpClient::new(server_id, transport).with_events(self.inner.events.clone());
        client.start();
        client
            .initialize(&ClientCapabilities::default(), self.inner.config.init_timeout)
            .await
            .map_err(SupervisorError::Handshake)?;
        client.tools_list(self.inner.config.init_timeout).await.map_err(SupervisorError::Handshake)?;
        Ok(RuntimeHandle { child, client, installation: installation.clone() })
    }

    /// Stop a server. Sends a graceful close first when `graceful`; always
    /// kills the child if it has not exited by `stop_grace`.
    ///
    /// # Errors
    /// Returns [`SupervisorError::NotFound`] if `server_id` is not supervised.
    pub async fn stop(&self, server_id: ServerId, graceful: bool) -> SupervisorResult<()> {
        let process = self.get(server_id)?;
        process.cancel.cancel();
        process.set_state(ServerState::Stopping);
        self.publish_state(server_id, ServerState::Stopping);

        let mut runtime = process.runtime.lock().await;
        runtime.client.close().await;
        if graceful {
            match tokio::time::timeout(self.inner.config.stop_grace, runtime.child.wait()).await {
                Ok(_) => {}
                Err(_) => {
                    let _ = runtime.child.kill().await;
                }
            }
        } else {
            let _ = runtime.child.kill().await;
        }
        drop(runtime);

        process.set_state(ServerState::Stopped);
        self.publish_state(server_id, ServerState::Stopped);
        self.inner.processes.remove(&server_id);
        Ok(())
    }

    /// Restart a server in place: the child is killed and respawned from its
    /// current installation, but `server_id` and `restart_count` persist.
    ///
    /// # Errors
    /// Returns [`SupervisorError::NotFound`] if `server_id` is not supervised,
    /// or a spawn/handshake error if the respawn fails.
    pub async fn restart(&self, server_id: ServerId) -> SupervisorResult<()> {
        let process = self.get(server_id)?;
        self.restart_process(&process).await
    }

    async fn restart_process(&self, process: &Arc<ManagedProcess>) -> SupervisorResult<()> {
        let server_id = process.server_id;
        let attempt = process.bump_restart_count();
        let delay = backoff_delay(
            attempt,
            Duration::from_secs(1),
            self.inner.config.max_backoff,
            2.0,
            0.2,
        );
        tokio::time::sleep(delay).await;

        let installation = {
            let mut runtime = process.runtime.lock().await;
            let _ = runtime.child.kill().await;
            runtime.installation.clone()
        };

        match self.spawn_runtime(server_id, &installation).await {
            Ok(new_runtime) => {
                process.set_install_id(new_runtime.installation.install_id);
                let mut runtime = process.runtime.lock().await;
                *runtime = new_runtime;
                drop(runtime);
                process.set_state(ServerState::Ready);
                process.record_health_success();
                self.publish_state(server_id, ServerState::Ready);
                Ok(())
            }
            Err(err) => {
                process.set_state(ServerState::Degraded);
                self.publish_state(server_id, ServerState::Degraded);
                Err(err)
            }
        }
    }

    /// A read-only snapshot of one supervised server.
    #[must_use]
    pub fn status(&self, server_id: ServerId) -> Option<ServerProcessSummary> {
        self.inner.processes.get(&server_id).map(|p| summarize(&p))
    }

    /// A snapshot of every supervised server.
    #[must_use]
    pub fn list(&self) -> Vec<ServerProcessSummary> {
        self.inner.processes.iter().map(|entry| summarize(entry.value())).collect()
    }

    /// The live MCP session for `server_id`, if it is currently `ready` or
    /// `degraded`. Backs [`aperture_registry::ServerSessionProvider`] without
    /// this crate depending on the Registry crate.
    #[must_use]
    pub async fn session(&self, server_id: ServerId) -> Option<McpClient> {
        let process = Arc::clone(&*self.inner.processes.get(&server_id)?);
        match process.state() {
            ServerState::Ready | ServerState::Degraded => {}
            ServerState::Starting | ServerState::Stopping | ServerState::Stopped | ServerState::Failed => {
                return None;
            }
        }
        let runtime = process.runtime.lock().await;
        Some(runtime.client.clone())
    }

    /// Stop every supervised server, most-recent-first is not guaranteed;
    /// used during graceful daemon shutdown (spec §5, §8 property 7).
    pub async fn stop_all(&self, graceful: bool) {
        let ids: Vec<ServerId> = self.inner.processes.iter().map(|e| *e.key()).collect();
        for id in ids {
            if let Err(err) = self.stop(id, graceful).await {
                warn!(server_id = %id, error = %err, "failed to stop server during shutdown");
            }
        }
    }

    fn get(&self, server_id: ServerId) -> SupervisorResult<Arc<ManagedProcess>> {
        self.inner.processes.get(&server_id).map(|p| Arc::clone(p.value())).ok_or(SupervisorError::NotFound(server_id))
    }

    fn publish_state(&self, server_id: ServerId, state: ServerState) {
        self.inner.events.publish(ApertureEvent::ServerProcessStateChanged {
            at: Timestamp::now(),
            server_id,
            state: state.label().to_string(),
        });
    }
}

fn spawn_child(launch_spec: &LaunchSpec) -> std::io::Result<Child> {
    let mut command = Command::new(&launch_spec.command);
    command.args(&launch_spec.args);
    command.current_dir(&launch_spec.working_dir);
    for (key, value) in &launch_spec.env {
        command.env(key, value);
    }
    command.stdin(Stdio::piped()).stdout(Stdio::piped()).stderr(Stdio::null()).kill_on_drop(true);
    command.spawn()
}

fn summarize(process: &Arc<ManagedProcess>) -> ServerProcessSummary {
    ServerProcessSummary {
        server_id: process.server_id,
        install_id: process.install_id(),
        capabilities: process.capabilities.clone(),
        state: process.state(),
        restart_policy: process.restart_policy,
        restart_count: process.restart_count(),
        last_health_at: *process.last_health_at.lock(),
        resource: *process.resource.lock(),
    }
}

async fn health_loop(inner: Arc<Inner>, server_id: ServerId, cancel: tokio_util::sync::CancellationToken) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => return,
            () = tokio::time::sleep(inner.config.health_interval) => {}
        }

        let Some(process) = inner.processes.get(&server_id).map(|p| Arc::clone(p.value())) else {
            return;
        };
        if process.state() == ServerState::Stopping || process.state() == ServerState::Stopped {
            return;
        }

        if probe(&inner, &process).await {
            let was_degraded = process.state() == ServerState::Degraded;
            process.record_health_success();
            if was_degraded {
                process.set_state(ServerState::Ready);
                publish(&inner, server_id, ServerState::Ready);
            }
            if let Some(rss_kb) = sample_resources(&process).await {
                check_resource_limits(&inner, &process, rss_kb).await;
            }
            continue;
        }

        let failures = process.record_health_failure();
        process.set_state(ServerState::Degraded);
        publish(&inner, server_id, ServerState::Degraded);
        escalate(&inner, &process, failures).await;
    }
}

async fn probe(inner: &Arc<Inner>, process: &Arc<ManagedProcess>) -> bool {
    let runtime = process.runtime.lock().await;
    match &process.health_check {
        HealthCheckStrategy::Liveness => runtime.client.state().accepts_calls(),
        HealthCheckStrategy::Protocol => {
            runtime.client.tools_list(inner.config.health_probe_timeout).await.is_ok()
        }
        HealthCheckStrategy::Custom(probe) => probe.probe(&runtime.client).await,
    }
}

async fn sample_resources(process: &Arc<ManagedProcess>) -> Option<u64> {
    let runtime = process.runtime.lock().await;
    let pid = runtime.child.id()?;
    drop(runtime);
    let rss_kb = sample_rss_kb(pid);
    *process.resource.lock() = ResourceUsage { rss_kb };
    rss_kb
}

/// Warn past the soft ceiling, restart past the hard ceiling (spec §4.13
/// "Resource accounting").
async fn check_resource_limits(inner: &Arc<Inner>, process: &Arc<ManagedProcess>, rss_kb: u64) {
    let limits = inner.config.resource_limits;
    if rss_kb >= limits.hard_rss_kb {
        warn!(server_id = %process.server_id, rss_kb, hard_rss_kb = limits.hard_rss_kb, "server exceeded hard RSS ceiling, restarting");
        if let Err(err) = restart_with_inner(inner, process).await {
            warn!(server_id = %process.server_id, error = %err, "restart after RSS ceiling breach failed");
        }
    } else if rss_kb >= limits.soft_rss_kb {
        warn!(server_id = %process.server_id, rss_kb, soft_rss_kb = limits.soft_rss_kb, "server exceeded soft RSS ceiling");
    }
}

fn sample_rss_kb(pid: u32) -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let status = std::fs::read_to_string(format!("/proc/{pid}/status")).ok()?;
        for line in status.lines() {
            if let Some(rest) = line.strip_prefix("VmRSS:") {
                return rest.trim().split_whitespace().next()?.parse::<u64>().ok();
            }
        }
        None
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = pid;
        None
    }
}

/// Walks one rung of the failure escalation ladder (spec §4.13): reconnect,
/// graceful restart, forced restart, reinstall-and-restart, or mark failed.
async fn escalate(inner: &Arc<Inner>, process: &Arc<ManagedProcess>, consecutive_failures: u32) {
    let server_id = process.server_id;
    let rung = match consecutive_failures {
        1 => "reconnect",
        2 => "graceful_restart",
        3 => "forced_restart",
        4 => "reinstall_and_restart",
        _ => "marked_failed",
    };
    info!(%server_id, rung, consecutive_failures, "supervisor escalation ladder advancing");
    audit(inner, DiagnosticEvent::SupervisorEscalated { server_id, rung: rung.to_string(), consecutive_failures }).await;

    match consecutive_failures {
        1 => {
            // Reconnect: re-probe immediately rather than respawning; a
            // transient blip self-heals here without disturbing the child.
            if probe(inner, process).await {
                process.record_health_success();
                process.set_state(ServerState::Ready);
                publish(inner, server_id, ServerState::Ready);
            }
        }
        2 | 3 => {
            if let Err(err) = restart_with_inner(inner, process).await {
                warn!(%server_id, error = %err, "escalation restart failed");
            }
        }
        4 => {
            let Some(reinstaller) = inner.reinstaller.clone() else {
                mark_failed(inner, process, "reinstall requested but no reinstaller configured").await;
                return;
            };
            let installation = process.runtime.lock().await.installation.clone();
            match reinstaller.reinstall(&installation).await {
                Ok(fresh) => {
                    {
                        let mut runtime = process.runtime.lock().await;
                        runtime.installation = fresh;
                    }
                    if let Err(err) = restart_with_inner(inner, process).await {
                        mark_failed(inner, process, &format!("reinstall succeeded but restart failed: {err}")).await;
                    }
                }
                Err(reason) => {
                    mark_failed(inner, process, &format!("reinstall failed: {reason}")).await;
                }
            }
        }
        _ => {
            mark_failed(inner, process, "escalation ladder exhausted").await;
        }
    }
}

async fn restart_with_inner(inner: &Arc<Inner>, process: &Arc<ManagedProcess>) -> SupervisorResult<()> {
    let supervisor = Supervisor { inner: Arc::clone(inner) };
    supervisor.restart_process(process).await
}

async fn mark_failed(inner: &Arc<Inner>, process: &Arc<ManagedProcess>, message: &str) {
    let server_id = process.server_id;
    process.set_state(ServerState::Failed);
    publish(inner, server_id, ServerState::Failed);
    audit(inner, DiagnosticEvent::OperatorAlert { server_id, message: message.to_string() }).await;
}

async fn audit(inner: &Arc<Inner>, event: DiagnosticEvent) {
    if let Err(err) = inner.audit.append(event).await {
        warn!(error = %err, "failed to append diagnostic record");
    }
}

fn publish(inner: &Arc<Inner>, server_id: ServerId, state: ServerState) {
    inner.events.publish(ApertureEvent::ServerProcessStateChanged {
        at: Timestamp::now(),
        server_id,
        state: state.label().to_string(),
    });
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use aperture_storage::MemoryKvStore;

    use super::*;

    #[test]
    fn config_from_aperture_config_carries_every_field() {
        let config = aperture_config::Config::default();
        let supervisor_config = SupervisorConfig::from(&config);
        assert_eq!(supervisor_config.max_children, config.limits.max_children);
        assert_eq!(supervisor_config.init_timeout, config.timeouts.init_timeout());
        assert_eq!(supervisor_config.stop_grace, config.timeouts.stop_grace());
        assert_eq!(
            supervisor_config.max_backoff,
            Duration::from_millis(config.thresholds.supervisor_max_backoff_ms)
        );
    }

    async fn test_supervisor() -> Supervisor {
        let store: Arc<dyn aperture_storage::KvStore> = Arc::new(MemoryKvStore::new());
        let audit = Arc::new(AuditLog::open(store).await.unwrap());
        Supervisor::new(SupervisorConfig::default(), EventBus::new(), audit)
    }

    #[tokio::test]
    async fn unknown_server_id_reports_not_found() {
        let supervisor = test_supervisor().await;
        let err = supervisor.stop(ServerId::new(), true).await.unwrap_err();
        assert!(matches!(err, SupervisorError::NotFound(_)));
        assert_eq!(err.kind(), aperture_core::ErrorKind::ResourceNotFound);
    }

    #[tokio::test]
    async fn status_is_none_for_a_server_never_started() {
        let supervisor = test_supervisor().await;
        assert!(supervisor.status(ServerId::new()).is_none());
        assert!(supervisor.is_empty());
        assert!(supervisor.list().is_empty());
    }
}
