//! Aperture RPC — JSON-RPC 2.0 message types, parsing, validation, and the
//! canonical MCP error taxonomy (spec §4.2).
//!
//! This crate is deliberately transport-agnostic: it knows how to turn
//! bytes into a [`Message`] and back, and nothing about how those bytes
//! arrived. [`aperture_core::ErrorKind`] is the single source of truth for
//! error codes; this crate only wraps it in the wire-facing
//! [`RpcError`] shape.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod codec;
pub mod error;
pub mod idgen;
pub mod message;

pub use codec::{build_batch_response, decode, encode, encode_value, error_response_for};
pub use error::{CodecError, CodecResult, RpcError};
pub use idgen::RpcIdGenerator;
pub use message::{JSONRPC_VERSION, Message, Notification, Request, Response, RpcId};
