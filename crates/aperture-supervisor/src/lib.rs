//! Aperture Supervisor — external server process lifecycle: spawn, restart
//! policy, health checks, the failure escalation ladder, and resource
//! accounting (spec §3 `ServerProcess`, §4.13).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
mod process;
pub mod supervisor;
pub mod types;

pub use error::{SupervisorError, SupervisorResult};
pub use supervisor::{Reinstaller, Supervisor, SupervisorConfig};
pub use types::{
    HealthCheckStrategy, HealthProbe, ResourceLimits, ResourceUsage, RestartPolicy,
    ServerProcessSummary, ServerState, StartSpec,
};
