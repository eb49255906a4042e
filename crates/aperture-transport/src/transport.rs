//! The carrier-agnostic [`Transport`] trait (spec §4.3).

use async_trait::async_trait;

use crate::error::TransportResult;

/// A byte carrier between this process and one external MCP server.
///
/// Implementations know nothing about JSON-RPC; they move opaque frames.
/// `open` is carrier-specific (spawning a child process, dialing a TCP
/// socket, completing a `WebSocket` handshake) and so is not part of this
/// trait — each concrete type exposes its own constructor instead.
/// `close` is idempotent: calling it twice is not an error, and any
/// `send`/`receive` issued after a completed `close` returns
/// [`crate::TransportError::AlreadyClosed`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Write one frame. For newline-framed carriers, `frame` must not
    /// itself contain an embedded newline.
    async fn send(&self, frame: &[u8]) -> TransportResult<()>;

    /// Read the next complete frame, blocking until one arrives.
    ///
    /// Returns [`crate::TransportError::ClosedByPeer`] if the peer closes
    /// the connection before a full frame is available.
    async fn receive(&self) -> TransportResult<Vec<u8>>;

    /// Shut the carrier down. Safe to call more than once.
    async fn close(&self) -> TransportResult<()>;

    /// Whether [`Transport::close`] has already completed.
    fn is_closed(&self) -> bool;
}
