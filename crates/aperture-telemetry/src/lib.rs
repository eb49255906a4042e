//! Aperture Telemetry — structured logging setup and request-correlation
//! spans for the capability-acquisition daemon (spec §1.1 ambient stack).
//!
//! [`setup_logging`] installs a global `tracing` subscriber from a
//! [`LogConfig`] built from [`aperture_config::LoggingConfig`];
//! [`RequestContext`] threads a stable correlation id through a chain of log
//! lines (a router call, an acquisition job) independent of whichever
//! component id is also in scope.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod context;
pub mod error;
pub mod logging;

pub use context::{RequestContext, RequestGuard};
pub use error::{TelemetryError, TelemetryResult};
pub use logging::{LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging};
