//! Aperture Orchestrator — the `AcquisitionJob` state machine binding
//! Discovery, the Installer, the Sandbox, the Supervisor, and the Registry
//! (spec §4.16).
//!
//! [`Orchestrator::submit`] coalesces concurrent requests for the same
//! capability onto a single job and drives it through
//! `discovering -> ranking -> installing -> verifying -> registering ->
//! done`/`failed`, rolling back a cancelled or failed install/verify and
//! treating `registering` as the sole commit point.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod job;
pub mod orchestrator;
pub mod probes;
pub mod types;

pub use error::{OrchestratorError, OrchestratorResult, Phase};
pub use job::AcquisitionJob;
pub use orchestrator::{Orchestrator, OrchestratorDeps};
pub use probes::{NoProbes, ProbeCatalog};
pub use types::{AcquisitionRequest, JobSummary, PhaseDeadlines, Priority};
