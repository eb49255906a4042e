//! TCP transport: newline-delimited JSON over a socket (spec §4.3).
//!
//! Newline framing was chosen over length-prefixing so the TCP and stdio
//! carriers share one codec implementation (see `DESIGN.md`).

use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::error::TransportResult;
use crate::line::LineTransport;

/// Newline-framed transport over a TCP socket.
pub type TcpTransport = LineTransport<OwnedReadHalf, OwnedWriteHalf>;

/// Dial `addr` and wrap the resulting socket as a [`Transport`](crate::Transport).
///
/// # Errors
/// Returns [`crate::TransportError::Io`] if the connection attempt fails.
pub async fn connect(addr: &str) -> TransportResult<TcpTransport> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    let (read, write) = stream.into_split();
    Ok(LineTransport::new(read, write))
}
