//! Aperture Config — typed, hot-reloadable settings for the capability-acquisition daemon.
//!
//! A single [`Config`] root, grouped into sections (timeouts, limits, thresholds,
//! policies, endpoints, logging, gateway), each with a [`Default`] so a bare or
//! absent config file still produces a working daemon. [`load_and_watch`] adds a
//! filesystem watcher that re-reads and re-validates the file on change and
//! publishes successful reloads through a [`ConfigHandle`] — no supervised child
//! is ever restarted purely because configuration changed.
//!
//! This crate has no dependency on any other crate in the workspace: every other
//! crate depends on it, never the reverse.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod loader;
pub mod types;
pub mod watch;

pub use error::{ConfigError, ConfigResult};
pub use types::{
    Config, EndpointsConfig, GatewayConfig, LimitsConfig, LogFormat, LoggingConfig,
    PoliciesConfig, RankingWeights, RestartPolicy, ThresholdsConfig, TimeoutsConfig,
};
pub use watch::{ConfigHandle, load_and_watch};
