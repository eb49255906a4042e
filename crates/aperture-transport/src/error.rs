//! Transport-layer errors.

use aperture_core::ErrorKind;

/// Failures a [`crate::Transport`] can report (spec §4.3).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The underlying carrier (pipe, socket, `WebSocket`) reported an I/O
    /// error.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The peer closed the connection, or a `WebSocket` close frame was
    /// received.
    #[error("transport closed by peer")]
    ClosedByPeer,
    /// `send`/`receive` was called after [`crate::Transport::close`] had
    /// already completed.
    #[error("transport is closed")]
    AlreadyClosed,
    /// A received frame could not be decoded as UTF-8 text.
    #[error("invalid frame encoding: {0}")]
    InvalidFrame(String),
    /// The `WebSocket` handshake or connect failed.
    #[error("websocket error: {0}")]
    WebSocket(#[from] Box<tokio_tungstenite::tungstenite::Error>),
}

impl TransportError {
    /// The canonical [`ErrorKind`] this failure maps onto; always
    /// [`ErrorKind::TransportError`] (spec §7 — transports only ever raise
    /// this one kind, never timeouts, which are a Client-layer concern).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::TransportError
    }
}

/// Result alias for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
