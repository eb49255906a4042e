//! Aperture Core - Foundation types shared across the capability-acquisition daemon.
//!
//! This crate provides:
//! - Newtype identifiers for every addressable entity (capability, server, job, ...)
//! - The canonical [`ErrorKind`] taxonomy that every crate's error enum maps onto
//! - `Timestamp` and retry-delay helpers used by the scheduler and resilience layer
//!
//! Nothing here talks to the network, the filesystem, or a child process; it is the
//! vocabulary the other crates share so that `server_id`, `capability`, and friends
//! mean the same thing everywhere.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error_kind;
pub mod ids;
pub mod prelude;
pub mod retry_math;
pub mod time;

pub use error_kind::{ErrorKind, Recoverability};
pub use ids::{CapabilityName, DlqEntryId, InstallId, JobId, RequestId, ServerId};
pub use retry_math::backoff_delay;
pub use time::Timestamp;
