//! Dedup-locked, atomic install orchestration (spec §4.11, §5 "Shared resources").

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use aperture_core::InstallId;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{InstallerError, InstallerResult};
use crate::methods;
use crate::types::{InstallRequest, Installation};

type InstallOutcome = Result<Arc<Installation>, InstallerError>;

/// Operator-configured constraints on what may be installed.
#[derive(Debug, Clone, Default)]
pub struct InstallPolicy {
    /// If non-empty, only these package names may be installed.
    pub package_whitelist: Vec<String>,
    /// Package names that are always refused, even if whitelisted.
    pub dangerous_name_blacklist: Vec<String>,
}

/// Dispatches install methods under a per-`(name, version)` dedup lock, with
/// atomic install directories (spec §4.11).
///
/// At most one [`install`](Installer::install) body runs per identity at a
/// time: a second concurrent caller either joins the first's result or, if it
/// opts out of waiting, receives [`InstallerError::AlreadyInstalling`]
/// immediately. Neither path runs the install body twice.
pub struct Installer {
    install_root: PathBuf,
    install_deadline: Duration,
    policy: InstallPolicy,
    inflight: DashMap<String, watch::Sender<Option<InstallOutcome>>>,
}

impl Installer {
    /// Build an installer rooted at `install_root`.
    #[must_use]
    pub fn new(install_root: PathBuf, install_deadline: Duration, policy: InstallPolicy) -> Self {
        Self { install_root, install_deadline, policy, inflight: DashMap::new() }
    }

    /// Run (or join) the install for `request`.
    ///
    /// If `wait_for_inflight` is `false` and another caller is already
    /// installing this identity, returns [`InstallerError::AlreadyInstalling`]
    /// instead of blocking.
    ///
    /// # Errors
    /// Returns whatever the install body returned, or
    /// [`InstallerError::DeadlineExceeded`] if it exceeded `install_deadline`.
    pub async fn install(&self, request: InstallRequest, wait_for_inflight: bool) -> InstallerResult<Arc<Installation>> {
        let identity = request.identity();

        let tx = match self.inflight.entry(identity.clone()) {
            Entry::Occupied(entry) => {
                if !wait_for_inflight {
                    return Err(InstallerError::AlreadyInstalling(identity));
                }
                let mut rx = entry.get().subscribe();
                drop(entry);
                return Self::join(&mut rx).await;
            }
            Entry::Vacant(vacant) => {
                let (tx, _rx) = watch::channel(None);
                vacant.insert(tx.clone());
                tx
            }
        };

        let outcome = match tokio::time::timeout(self.install_deadline, self.run_body(&request)).await {
            Ok(result) => result.map(Arc::new),
            Err(_elapsed) => Err(InstallerError::DeadlineExceeded),
        };

        self.inflight.remove(&identity);
        let _ = tx.send(Some(outcome.clone()));
        outcome
    }

    async fn join(rx: &mut watch::Receiver<Option<InstallOutcome>>) -> InstallerResult<Arc<Installation>> {
        loop {
            if let Some(outcome) = rx.borrow().clone() {
                return outcome;
            }
            if rx.changed().await.is_err() {
                return Err(InstallerError::CommandFailed("install coordinator dropped before completion".into()));
            }
        }
    }

    async fn run_body(&self, request: &InstallRequest) -> InstallerResult<Installation> {
        self.check_policy(&request.name)?;

        std::fs::create_dir_all(&self.install_root)
            .map_err(|e| InstallerError::Directory(format!("failed to create {}: {e}", self.install_root.display())))?;

        let staging = tempfile::tempdir_in(&self.install_root)
            .map_err(|e| InstallerError::Directory(format!("failed to create staging directory: {e}")))?;

        info!(identity = %request.identity(), staging = %staging.path().display(), "starting install");

        let launch_spec = methods::run(&request.method, staging.path()).await?;

        let final_dir = self.install_root.join(sanitize(&request.identity()));
        if final_dir.exists() {
            std::fs::remove_dir_all(&final_dir)
                .map_err(|e| InstallerError::Directory(format!("failed to clear stale install dir: {e}")))?;
        }

        let staging_path = staging.path().to_path_buf();
        std::fs::rename(&staging_path, &final_dir)
            .map_err(|e| InstallerError::Directory(format!("failed to commit install directory: {e}")))?;
        // The rename moved staging's contents out from under the TempDir guard;
        // forget it so its Drop does not try to remove the now-relocated path.
        std::mem::forget(staging);

        let launch_spec = LaunchSpecPath::rebase(launch_spec, &staging_path, &final_dir);

        let manifest_hash = hash_directory(&final_dir)
            .map_err(|e| InstallerError::Directory(format!("failed to hash install directory: {e}")))?;

        Ok(Installation {
            install_id: InstallId::new(),
            source_ref: request.source_ref.clone(),
            install_dir: final_dir,
            launch_spec,
            method: request.method.clone(),
            manifest_hash,
        })
    }

    fn check_policy(&self, name: &str) -> InstallerResult<()> {
        if self.policy.dangerous_name_blacklist.iter().any(|blocked| blocked == name) {
            warn!(name, "install refused: blacklisted name");
            return Err(InstallerError::Blacklisted(name.to_string()));
        }
        if !self.policy.package_whitelist.is_empty() && !self.policy.package_whitelist.iter().any(|allowed| allowed == name) {
            warn!(name, "install refused: not on whitelist");
            return Err(InstallerError::NotWhitelisted(name.to_string()));
        }
        Ok(())
    }

    /// Remove a committed installation's directory, rolling back an install
    /// that was cancelled or failed verification downstream (Orchestrator
    /// rollback on `installing`/`verifying` cancellation).
    ///
    /// # Errors
    /// Returns [`InstallerError::Directory`] if the directory cannot be removed.
    pub fn remove(&self, installation: &Installation) -> InstallerResult<()> {
        if !installation.install_dir.exists() {
            return Ok(());
        }
        std::fs::remove_dir_all(&installation.install_dir)
            .map_err(|e| InstallerError::Directory(format!("failed to remove install dir: {e}")))
    }
}

/// Rewrites a `LaunchSpec`'s `working_dir` (and any argument equal to it) from
/// the staging path to the committed install directory.
struct LaunchSpecPath;

impl LaunchSpecPath {
    fn rebase(mut spec: crate::types::LaunchSpec, from: &Path, to: &Path) -> crate::types::LaunchSpec {
        if spec.working_dir == from {
            spec.working_dir = to.to_path_buf();
        }
        spec
    }
}

fn sanitize(identity: &str) -> String {
    identity
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '-' })
        .collect()
}

/// Hash the relative paths and sizes of every regular file under `dir`, for
/// drift detection rather than cryptographic provenance.
fn hash_directory(dir: &Path) -> std::io::Result<String> {
    let mut entries = Vec::new();
    collect_entries(dir, dir, &mut entries)?;
    entries.sort();

    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.as_bytes());
        hasher.update(b"\n");
    }
    Ok(hex::encode(hasher.finalize()))
}

fn collect_entries(root: &Path, dir: &Path, out: &mut Vec<String>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            collect_entries(root, &path, out)?;
        } else {
            let relative = path.strip_prefix(root).unwrap_or(&path);
            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            out.push(format!("{}:{size}", relative.display()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> InstallPolicy {
        InstallPolicy::default()
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize("@scope/pkg@1.0.0"), "-scope-pkg-1.0.0");
    }

    #[tokio::test]
    async fn blacklisted_name_is_refused_before_any_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let installer = Installer::new(
            dir.path().to_path_buf(),
            Duration::from_secs(5),
            InstallPolicy { package_whitelist: Vec::new(), dangerous_name_blacklist: vec!["rm".into()] },
        );
        let request = InstallRequest::new("rm", "1.0.0", "npm:rm@1.0.0").unwrap();

        let err = installer.install(request, true).await.unwrap_err();
        assert!(matches!(err, InstallerError::Blacklisted(_)));
    }

    #[tokio::test]
    async fn whitelist_rejects_unlisted_package() {
        let dir = tempfile::tempdir().unwrap();
        let installer = Installer::new(
            dir.path().to_path_buf(),
            Duration::from_secs(5),
            InstallPolicy { package_whitelist: vec!["allowed-server".into()], dangerous_name_blacklist: Vec::new() },
        );
        let request = InstallRequest::new("other-server", "1.0.0", "npm:other-server@1.0.0").unwrap();

        let err = installer.install(request, true).await.unwrap_err();
        assert!(matches!(err, InstallerError::NotWhitelisted(_)));
    }

    #[tokio::test]
    async fn second_caller_without_wait_sees_already_installing() {
        let dir = tempfile::tempdir().unwrap();
        let installer = Arc::new(Installer::new(dir.path().to_path_buf(), Duration::from_secs(5), policy()));

        let request = InstallRequest::new("slow-server", "1.0.0", "container:ghcr.io/example/slow:1.0").unwrap();
        let identity = request.identity();
        let (tx, _rx) = watch::channel(None);
        installer.inflight.insert(identity.clone(), tx);

        let second = InstallRequest::new("slow-server", "1.0.0", "container:ghcr.io/example/slow:1.0").unwrap();
        let err = installer.install(second, false).await.unwrap_err();
        assert!(matches!(err, InstallerError::AlreadyInstalling(_)));
    }
}
