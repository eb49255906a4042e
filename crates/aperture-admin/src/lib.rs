//! Aperture Admin — the in-process `AdminApi` trait boundary: status, job,
//! and server introspection plus control operations (spec §4.18, §6 "Admin
//! surface").
//!
//! No wire protocol is implemented here. This crate is deliberately just the
//! typed interface; a collaborator binds HTTP, WebSocket, or a CLI onto
//! [`AdminApi`] outside this specification's scope.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod admin;
pub mod error;
pub mod types;

pub use admin::AdminApi;
pub use error::{AdminError, AdminResult};
pub use types::{ServerDetails, StopServerRequest, SystemStatus};
