//! Aperture Transport — a uniform byte carrier over stdio, TCP, and
//! `WebSocket` (spec §4.3).
//!
//! Every carrier implements [`Transport`], move opaque frames, and know
//! nothing of JSON-RPC; [`aperture_rpc`](../aperture_rpc/index.html) sits
//! one layer up. `open` is carrier-specific — see [`stdio::open`],
//! [`tcp::connect`], and [`WebSocketTransport::connect`] — since each
//! carrier's setup takes different arguments.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
mod line;
pub mod stdio;
pub mod tcp;
pub mod transport;
pub mod websocket;

pub use error::{TransportError, TransportResult};
pub use line::LineTransport;
pub use stdio::StdioTransport;
pub use tcp::TcpTransport;
pub use transport::Transport;
pub use websocket::WebSocketTransport;
