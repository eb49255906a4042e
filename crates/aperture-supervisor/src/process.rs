//! The mutable runtime state of one supervised server (spec §3 `ServerProcess`).

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use aperture_core::{CapabilityName, InstallId, ServerId, Timestamp};
use aperture_installer::Installation;
use aperture_mcp::McpClient;
use parking_lot::Mutex;
use tokio::process::Child;
use tokio_util::sync::CancellationToken;

use crate::types::{HealthCheckStrategy, ResourceUsage, RestartPolicy, ServerState};

/// The part of a server's state that changes on every restart: the child
/// handle, its live session, and the installation it was launched from.
pub struct RuntimeHandle {
    pub(crate) child: Child,
    pub(crate) client: McpClient,
    pub(crate) installation: Installation,
}

/// One supervised server, owned exclusively by the [`crate::Supervisor`].
///
/// `server_id` is stable across restarts — spec §3 tracks `restart_count` on
/// a single `ServerProcess`, not a freshly-minted identity each time.
pub struct ManagedProcess {
    pub(crate) server_id: ServerId,
    pub(crate) capabilities: Vec<CapabilityName>,
    pub(crate) restart_policy: RestartPolicy,
    pub(crate) health_check: HealthCheckStrategy,
    pub(crate) runtime: tokio::sync::Mutex<RuntimeHandle>,
    pub(crate) install_id: Mutex<InstallId>,
    pub(crate) state: Mutex<ServerState>,
    pub(crate) restart_count: AtomicU32,
    pub(crate) consecutive_failures: AtomicU32,
    pub(crate) last_health_at: Mutex<Option<Timestamp>>,
    pub(crate) resource: Mutex<ResourceUsage>,
    pub(crate) cancel: CancellationToken,
}

impl ManagedProcess {
    pub(crate) fn new(
        server_id: ServerId,
        capabilities: Vec<CapabilityName>,
        restart_policy: RestartPolicy,
        health_check: HealthCheckStrategy,
        runtime: RuntimeHandle,
    ) -> Arc<Self> {
        let install_id = runtime.installation.install_id;
        Arc::new(Self {
            server_id,
            capabilities,
            restart_policy,
            health_check,
            runtime: tokio::sync::Mutex::new(runtime),
            install_id: Mutex::new(install_id),
            state: Mutex::new(ServerState::Starting),
            restart_count: AtomicU32::new(0),
            consecutive_failures: AtomicU32::new(0),
            last_health_at: Mutex::new(None),
            resource: Mutex::new(ResourceUsage::default()),
            cancel: CancellationToken::new(),
        })
    }

    pub(crate) fn state(&self) -> ServerState {
        *self.state.lock()
    }

    pub(crate) fn install_id(&self) -> InstallId {
        *self.install_id.lock()
    }

    pub(crate) fn set_install_id(&self, install_id: InstallId) {
        *self.install_id.lock() = install_id;
    }

    pub(crate) fn set_state(&self, state: ServerState) {
        *self.state.lock() = state;
    }

    pub(crate) fn restart_count(&self) -> u32 {
        self.restart_count.load(Ordering::Acquire)
    }

    pub(crate) fn bump_restart_count(&self) -> u32 {
        self.restart_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub(crate) fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures.load(Ordering::Acquire)
    }

    pub(crate) fn record_health_success(&self) {
        self.consecutive_failures.store(0, Ordering::Release);
        *self.last_health_at.lock() = Some(Timestamp::now());
    }

    pub(crate) fn record_health_failure(&self) -> u32 {
        self.consecutive_failures.fetch_add(1, Ordering::AcqRel) + 1
    }
}
