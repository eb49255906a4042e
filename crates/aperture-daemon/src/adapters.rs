//! Small adapters binding the otherwise decoupled subsystems together.
//!
//! Per spec §9 ("Dynamic dispatch... register concrete implementations at
//! startup"), every cross-crate seam (`ServerSessionProvider`,
//! `OperationalVarietySource`, `Reinstaller`) is an interface owned by the
//! crate that *consumes* it; this module holds the daemon's concrete
//! implementations, the only place that is allowed to know about both sides.

use std::sync::Arc;

use aperture_core::ServerId;
use aperture_installer::{InstallRequest, Installation, Installer};
use aperture_mcp::McpClient;
use aperture_registry::ServerSessionProvider;
use aperture_supervisor::{Reinstaller, Supervisor};
use aperture_variety::{OperationalSnapshot, OperationalVarietySource};
use async_trait::async_trait;

/// Resolves a `server_id` to its live session by asking the Supervisor,
/// letting [`aperture_registry::Router`] stay ignorant of process lifecycle.
pub struct SupervisorSessionProvider {
    supervisor: Supervisor,
}

impl SupervisorSessionProvider {
    /// Wrap `supervisor` as a session provider.
    #[must_use]
    pub fn new(supervisor: Supervisor) -> Self {
        Self { supervisor }
    }
}

#[async_trait]
impl ServerSessionProvider for SupervisorSessionProvider {
    async fn session(&self, server_id: ServerId) -> Option<McpClient> {
        self.supervisor.session(server_id).await
    }
}

/// Reports the Registry's current shape to the Variety Engine as
/// `operational_variety` input (spec §4.15).
pub struct RegistryVarietySource {
    registry: Arc<aperture_registry::Registry>,
}

impl RegistryVarietySource {
    /// Wrap `registry` as a variety source.
    #[must_use]
    pub fn new(registry: Arc<aperture_registry::Registry>) -> Self {
        Self { registry }
    }
}

impl OperationalVarietySource for RegistryVarietySource {
    fn snapshot(&self) -> OperationalSnapshot {
        let servers = self.registry.list_servers();
        let tool_count = servers.iter().map(|s| s.tools.len()).sum();
        OperationalSnapshot {
            capability_count: self.registry.capability_count(),
            server_count: servers.len(),
            tool_count,
        }
    }
}

/// Re-runs the Installer for an existing [`Installation`], for the
/// Supervisor's escalation rung 4 ("full reinstall-and-restart", spec
/// §4.13).
///
/// An `Installation` does not retain the original candidate's bare
/// `name`/`version` (only the combined `source_ref`, spec §3), so this
/// adapter recovers them with the same `name@version` convention
/// `InstallRequest::identity` produces. Recorded as a known simplification
/// in DESIGN.md: a daemon that wants exact reinstall identity would carry
/// it alongside the `Installation` record instead of re-deriving it.
pub struct InstallerReinstaller {
    installer: Arc<Installer>,
}

impl InstallerReinstaller {
    /// Wrap `installer` as a reinstaller.
    #[must_use]
    pub fn new(installer: Arc<Installer>) -> Self {
        Self { installer }
    }
}

#[async_trait]
impl Reinstaller for InstallerReinstaller {
    async fn reinstall(&self, current: &Installation) -> Result<Installation, String> {
        let (name, version) = derive_identity(&current.source_ref);
        let request = InstallRequest::new(name, version, current.source_ref.clone())
            .map_err(|err| err.to_string())?;
        let installation = self.installer.install(request, true).await.map_err(|err| err.to_string())?;
        Ok((*installation).clone())
    }
}

fn derive_identity(source_ref: &str) -> (String, String) {
    let spec = source_ref.split_once(':').map_or(source_ref, |(_, rest)| rest);
    match spec.rsplit_once('@') {
        Some((name, version)) if !name.is_empty() && !version.is_empty() => {
            (name.to_string(), version.to_string())
        }
        _ => (spec.to_string(), "latest".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_name_and_version_from_npm_style_source_ref() {
        assert_eq!(derive_identity("npm:@scope/pkg@1.2.0"), ("@scope/pkg".to_string(), "1.2.0".to_string()));
    }

    #[test]
    fn falls_back_to_latest_when_no_version_is_present() {
        assert_eq!(derive_identity("container:ghcr.io/org/img"), ("ghcr.io/org/img".to_string(), "latest".to_string()));
    }
}
