//! Install methods, launch specs, and the `Installation` record (spec §3, §4.11).

use std::path::PathBuf;

use aperture_core::InstallId;
use serde::{Deserialize, Serialize};

use crate::error::{InstallerError, InstallerResult};

/// A package manager capable of fetching a published server package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackageManager {
    /// `npm install <spec>`.
    Npm,
    /// `pip install <spec>`.
    Pip,
    /// `cargo install <spec>`.
    Cargo,
}

impl PackageManager {
    /// The binary this manager expects to find on `PATH`.
    #[must_use]
    pub fn binary(self) -> &'static str {
        match self {
            Self::Npm => "npm",
            Self::Pip => "pip",
            Self::Cargo => "cargo",
        }
    }
}

/// How a candidate's source is turned into a running server (spec §4.11).
///
/// Determined once, at `InstallRequest` construction time, from the
/// candidate's `source_ref` string. The installer never inspects the
/// candidate itself — it only ever dispatches on this value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallMethod {
    /// Fetch a published package with a package manager.
    PackageManager {
        /// Manager used to resolve `spec`.
        manager: PackageManager,
        /// The manager-specific package specifier, e.g. `@scope/pkg@1.2.0`.
        spec: String,
    },
    /// Clone a git repository and optionally run a post-clone build.
    Git {
        /// Clone URL (`https://` or `ssh://` only).
        url: String,
        /// Tag, branch, or commit to check out. `None` clones the default branch.
        git_ref: Option<String>,
        /// Shell command run in the clone root after checkout, if any.
        build_command: Option<String>,
    },
    /// Reference a pre-built container image; no local build is performed.
    Container {
        /// Fully-qualified image reference.
        image: String,
    },
}

impl InstallMethod {
    /// Parse a source reference into an install method.
    ///
    /// Recognised prefixes: `npm:`, `pip:`, `cargo:`, `git:URL[@ref]`,
    /// `github:org/repo[@ref]`, `container:image` (alias `docker:image`).
    ///
    /// # Errors
    /// Returns [`InstallerError::UnsupportedSource`] if `source_ref` matches
    /// no recognised prefix.
    pub fn from_source_ref(source_ref: &str) -> InstallerResult<Self> {
        if let Some(spec) = source_ref.strip_prefix("npm:") {
            return Ok(Self::PackageManager { manager: PackageManager::Npm, spec: spec.to_string() });
        }
        if let Some(spec) = source_ref.strip_prefix("pip:") {
            return Ok(Self::PackageManager { manager: PackageManager::Pip, spec: spec.to_string() });
        }
        if let Some(spec) = source_ref.strip_prefix("cargo:") {
            return Ok(Self::PackageManager { manager: PackageManager::Cargo, spec: spec.to_string() });
        }
        if let Some(rest) = source_ref.strip_prefix("github:") {
            return Self::parse_github(rest);
        }
        if let Some(rest) = source_ref.strip_prefix("git:") {
            return Self::parse_git_url(rest);
        }
        if let Some(image) = source_ref.strip_prefix("container:") {
            return Ok(Self::Container { image: image.to_string() });
        }
        if let Some(image) = source_ref.strip_prefix("docker:") {
            return Ok(Self::Container { image: image.to_string() });
        }
        Err(InstallerError::UnsupportedSource(source_ref.to_string()))
    }

    fn parse_github(rest: &str) -> InstallerResult<Self> {
        let (path, git_ref) = split_ref(rest);
        let parts: Vec<&str> = path.splitn(2, '/').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(InstallerError::UnsupportedSource(format!("github:{rest}")));
        }
        Ok(Self::Git {
            url: format!("https://github.com/{}/{}.git", parts[0], parts[1]),
            git_ref,
            build_command: None,
        })
    }

    fn parse_git_url(rest: &str) -> InstallerResult<Self> {
        let (url, git_ref) = split_ref(rest);
        if !url.starts_with("https://") && !url.starts_with("ssh://") {
            return Err(InstallerError::UnsupportedSource(format!("git:{rest}")));
        }
        Ok(Self::Git { url, git_ref, build_command: None })
    }
}

/// Split `value@ref` into `(value, Option<ref>)`, recognising `@` only after
/// the URL authority so SSH URLs like `git@host:path` are not split early.
fn split_ref(s: &str) -> (String, Option<String>) {
    if let Some(scheme_end) = s.find("://") {
        let authority_start = scheme_end + 3;
        let after_scheme = &s[authority_start..];
        if let Some(at_pos) = after_scheme.rfind('@') {
            let split_pos = authority_start + at_pos;
            let (url, rest) = s.split_at(split_pos);
            let git_ref = &rest[1..];
            if git_ref.is_empty() {
                return (s.to_string(), None);
            }
            return (url.to_string(), Some(git_ref.to_string()));
        }
        return (s.to_string(), None);
    }
    if let Some(at_pos) = s.find('@') {
        let (value, rest) = s.split_at(at_pos);
        let git_ref = &rest[1..];
        if git_ref.is_empty() {
            return (s.to_string(), None);
        }
        return (value.to_string(), Some(git_ref.to_string()));
    }
    (s.to_string(), None)
}

/// A requirement handed to the installer: what to fetch and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// The candidate's package/repo name, used for the dedup key and policy checks.
    pub name: String,
    /// The candidate's version string.
    pub version: String,
    /// The original source reference `method` was parsed from, kept for the
    /// `Installation` record.
    pub source_ref: String,
    /// How to fetch and build this candidate.
    pub method: InstallMethod,
}

impl InstallRequest {
    /// Build a request, parsing `source_ref` into an [`InstallMethod`].
    ///
    /// # Errors
    /// Propagates [`InstallMethod::from_source_ref`] errors.
    pub fn new(name: impl Into<String>, version: impl Into<String>, source_ref: impl Into<String>) -> InstallerResult<Self> {
        let source_ref = source_ref.into();
        let method = InstallMethod::from_source_ref(&source_ref)?;
        Ok(Self { name: name.into(), version: version.into(), source_ref, method })
    }

    /// The `name@version` dedup identity (spec §5 "Shared resources").
    #[must_use]
    pub fn identity(&self) -> String {
        format!("{}@{}", self.name, self.version)
    }
}

/// How the Supervisor should launch an installed server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchSpec {
    /// The executable to run.
    pub command: String,
    /// Arguments passed to `command`.
    pub args: Vec<String>,
    /// Environment variables set for the child, in addition to the parent's.
    pub env: Vec<(String, String)>,
    /// The working directory the child is launched in.
    pub working_dir: PathBuf,
}

/// The durable result of a successful install (spec §3 `Installation`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    /// Unique identifier for this install.
    pub install_id: InstallId,
    /// The source reference this installation was built from.
    pub source_ref: String,
    /// The exclusively-owned directory holding the installed artifacts.
    pub install_dir: PathBuf,
    /// How to launch the installed server.
    pub launch_spec: LaunchSpec,
    /// The method used to produce this installation.
    pub method: InstallMethod,
    /// Digest over the install directory's contents, for drift detection.
    pub manifest_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_npm_spec() {
        let method = InstallMethod::from_source_ref("npm:@scope/pkg@1.2.0").unwrap();
        assert_eq!(
            method,
            InstallMethod::PackageManager { manager: PackageManager::Npm, spec: "@scope/pkg@1.2.0".into() }
        );
    }

    #[test]
    fn parses_github_shorthand_with_ref() {
        let method = InstallMethod::from_source_ref("github:org/repo@v1.0.0").unwrap();
        assert_eq!(
            method,
            InstallMethod::Git {
                url: "https://github.com/org/repo.git".into(),
                git_ref: Some("v1.0.0".into()),
                build_command: None,
            }
        );
    }

    #[test]
    fn parses_git_url_ssh_without_splitting_user() {
        let method = InstallMethod::from_source_ref("git:ssh://git@example.com/org/repo.git").unwrap();
        assert_eq!(
            method,
            InstallMethod::Git {
                url: "ssh://git@example.com/org/repo.git".into(),
                git_ref: None,
                build_command: None,
            }
        );
    }

    #[test]
    fn parses_container_reference() {
        let method = InstallMethod::from_source_ref("container:ghcr.io/org/server:1.0").unwrap();
        assert_eq!(method, InstallMethod::Container { image: "ghcr.io/org/server:1.0".into() });
    }

    #[test]
    fn rejects_unrecognised_prefix() {
        let err = InstallMethod::from_source_ref("ftp://example.com/pkg").unwrap_err();
        assert!(matches!(err, InstallerError::UnsupportedSource(_)));
    }

    #[test]
    fn rejects_blocked_url_scheme() {
        let err = InstallMethod::from_source_ref("git:file:///etc/passwd").unwrap_err();
        assert!(matches!(err, InstallerError::UnsupportedSource(_)));
    }

    #[test]
    fn identity_combines_name_and_version() {
        let request = InstallRequest::new("fs-server", "1.0.0", "npm:fs-server@1.0.0").unwrap();
        assert_eq!(request.identity(), "fs-server@1.0.0");
    }
}
