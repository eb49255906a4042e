//! Install-method dispatch, atomic install directories, and dedup locking
//! (spec §4.11).
//!
//! [`Installer::install`] is the sole entry point: it resolves an
//! [`InstallMethod`] already attached to the [`InstallRequest`], runs it
//! inside a staging directory, and only makes the result visible under
//! `install_root` via an atomic rename. Concurrent installs of the same
//! `name@version` are coalesced through a dedup lock.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod installer;
pub mod methods;
pub mod types;

pub use error::{InstallerError, InstallerResult};
pub use installer::{InstallPolicy, Installer};
pub use types::{InstallMethod, InstallRequest, Installation, LaunchSpec, PackageManager};
