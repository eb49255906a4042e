//! Aperture Oracle — an optional, non-blocking advisory scoring seam
//! consulted after Discovery ranks candidates (spec §4.17).
//!
//! Disabled by default: [`OracleConfig::weight`] defaults to `0.0`, so a
//! daemon with no oracle wired in (or an operator who has not opted in)
//! pays no cost beyond one `Option` check per acquisition.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod oracle;

pub use error::{OracleError, OracleResult};
pub use oracle::{AdvisoryOracle, OracleConfig, consult};
