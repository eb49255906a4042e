//! Aperture Audit — append-only, hash-chained diagnostic log.
//!
//! Records acquisition-job outcomes and Supervisor escalations (spec §3.1,
//! §9 ambient stack) so operators can reconstruct "why did capability X
//! appear/disappear" after the fact. Each [`entry::DiagnosticRecord`] carries
//! the hash of its predecessor; [`log::AuditLog::verify_chain`] detects a
//! truncated or tampered log without a separate integrity store.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod entry;
pub mod error;
pub mod log;

pub use entry::{ContentHash, DiagnosticEvent, DiagnosticRecord};
pub use error::{AuditError, AuditResult};
pub use log::AuditLog;
