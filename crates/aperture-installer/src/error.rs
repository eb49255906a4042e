//! Errors raised while dispatching and running an install (spec §4.11).

use aperture_core::ErrorKind;

/// Failures raised while resolving, fetching, or building an install.
#[derive(Debug, Clone, thiserror::Error)]
pub enum InstallerError {
    /// `source_ref` did not match any recognised install method prefix.
    #[error("unsupported install source: '{0}'")]
    UnsupportedSource(String),
    /// `package_whitelist` is non-empty and `name` is not in it.
    #[error("package '{0}' is not on the install whitelist")]
    NotWhitelisted(String),
    /// `name` matched an entry in `dangerous_name_blacklist`.
    #[error("package '{0}' is blocked by name")]
    Blacklisted(String),
    /// A package manager, git, or container command exited non-zero.
    #[error("install command failed: {0}")]
    CommandFailed(String),
    /// Creating, writing, or renaming the install directory failed.
    #[error("install directory error: {0}")]
    Directory(String),
    /// A concurrent install for the same `(name, version)` is already running
    /// and the caller declined to wait for it.
    #[error("install for '{0}' is already in progress")]
    AlreadyInstalling(String),
    /// The install did not complete within `install_deadline`.
    #[error("install deadline exceeded")]
    DeadlineExceeded,
}

impl InstallerError {
    /// The canonical [`ErrorKind`] this failure maps onto (spec §7).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DeadlineExceeded => ErrorKind::Timeout,
            _ => ErrorKind::InstallFailed,
        }
    }
}

/// Result alias for installer operations.
pub type InstallerResult<T> = Result<T, InstallerError>;
