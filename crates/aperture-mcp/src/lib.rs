//! Aperture MCP — the client-side Model Context Protocol session (spec §4.4).
//!
//! One [`McpClient`] wraps one open [`aperture_transport::Transport`] to one
//! external server: it drives the `initialize` handshake, tracks
//! [`SessionState`], and demultiplexes responses back to their callers via a
//! [`PendingRequestTable`]. Everything above this layer (the Router, the
//! Supervisor, the Sandbox & Verifier) talks to a server only through an
//! `McpClient`, never through its transport directly.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod client;
pub mod error;
pub mod pending;
pub mod session;
pub mod types;

pub use client::McpClient;
pub use error::{McpError, McpResult};
pub use pending::{PendingOutcome, PendingRequestTable};
pub use session::SessionState;
pub use types::{
    ClientCapabilities, InitializeOutcome, PromptDescriptor, ResourceDescriptor, ToolDescriptor,
};
