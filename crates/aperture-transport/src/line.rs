//! Newline-delimited framing, shared by the stdio and TCP carriers.
//!
//! Both carriers frame one JSON-RPC message per line (spec §4.3; the TCP
//! choice between newline- and length-prefixed framing is resolved in
//! `DESIGN.md`), so they share this one generic implementation rather than
//! duplicating the read/write loop per carrier.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::error::{TransportError, TransportResult};
use crate::transport::Transport;

/// A [`Transport`] over any paired `AsyncRead` + `AsyncWrite` half, framed
/// one message per newline-terminated line.
pub struct LineTransport<R, W> {
    reader: Mutex<BufReader<R>>,
    writer: Mutex<W>,
    closed: AtomicBool,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap an already-open read/write pair.
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader: Mutex::new(BufReader::new(reader)), writer: Mutex::new(writer), closed: AtomicBool::new(false) }
    }
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, frame: &[u8]) -> TransportResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::AlreadyClosed);
        }
        let mut writer = self.writer.lock().await;
        writer.write_all(frame).await?;
        if !frame.ends_with(b"\n") {
            writer.write_all(b"\n").await?;
        }
        writer.flush().await?;
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Vec<u8>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::AlreadyClosed);
        }
        let mut reader = self.reader.lock().await;
        loop {
            let mut line = String::new();
            let n = reader.read_line(&mut line).await?;
            if n == 0 {
                return Err(TransportError::ClosedByPeer);
            }
            let trimmed = line.trim_end_matches(['\n', '\r']);
            if trimmed.is_empty() {
                continue;
            }
            return Ok(trimmed.as_bytes().to_vec());
        }
    }

    async fn close(&self) -> TransportResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sends_and_receives_a_frame() {
        let (client, server) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client);
        let (server_read, server_write) = tokio::io::split(server);

        let client_transport = LineTransport::new(client_read, client_write);
        let server_transport = LineTransport::new(server_read, server_write);

        client_transport.send(b"hello").await.unwrap();
        let received = server_transport.receive().await.unwrap();
        assert_eq!(received, b"hello");
    }

    #[tokio::test]
    async fn receive_after_close_fails() {
        let (client, _server) = tokio::io::duplex(4096);
        let (read, write) = tokio::io::split(client);
        let transport = LineTransport::new(read, write);
        transport.close().await.unwrap();
        transport.close().await.unwrap();
        let err = transport.receive().await.unwrap_err();
        assert!(matches!(err, TransportError::AlreadyClosed));
    }

    #[tokio::test]
    async fn receive_on_peer_close_reports_closed_by_peer() {
        let (client, server) = tokio::io::duplex(4096);
        let (client_read, client_write) = tokio::io::split(client);
        drop(server);
        let transport = LineTransport::new(client_read, client_write);
        let err = transport.receive().await.unwrap_err();
        assert!(matches!(err, TransportError::ClosedByPeer));
    }
}
