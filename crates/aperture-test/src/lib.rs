//! Aperture Test — shared test utilities for the capability-acquisition
//! daemon: mock transports, a deterministic clock, and constructors for
//! commonly needed test values, reused as a dev-dependency across the
//! workspace.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! aperture-test.workspace = true
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod clock;
pub mod fixtures;
pub mod mocks;

pub use clock::ManualClock;
pub use fixtures::{initialize_result, test_capability, test_server_id, tools_list_result};
pub use mocks::MockTransport;
