//! `WebSocket` transport: one JSON text frame per message (spec §4.3).

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use crate::error::{TransportError, TransportResult};
use crate::transport::Transport;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Transport over a `WebSocket` connection; each [`Transport::send`] and
/// [`Transport::receive`] moves exactly one text frame.
pub struct WebSocketTransport {
    writer: Mutex<SplitSink<WsStream, WsMessage>>,
    reader: Mutex<SplitStream<WsStream>>,
    closed: AtomicBool,
}

impl WebSocketTransport {
    /// Complete the `WebSocket` handshake against `url` (must be `ws://` or
    /// `wss://`).
    ///
    /// # Errors
    /// Returns [`TransportError::WebSocket`] if the handshake fails.
    pub async fn connect(url: &str) -> TransportResult<Self> {
        let (stream, _response) =
            connect_async(url).await.map_err(|e| TransportError::WebSocket(Box::new(e)))?;
        let (writer, reader) = stream.split();
        Ok(Self { writer: Mutex::new(writer), reader: Mutex::new(reader), closed: AtomicBool::new(false) })
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, frame: &[u8]) -> TransportResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::AlreadyClosed);
        }
        let text = std::str::from_utf8(frame)
            .map_err(|e| TransportError::InvalidFrame(e.to_string()))?
            .to_string();
        let mut writer = self.writer.lock().await;
        writer.send(WsMessage::Text(text.into())).await.map_err(|e| TransportError::WebSocket(Box::new(e)))
    }

    async fn receive(&self) -> TransportResult<Vec<u8>> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::AlreadyClosed);
        }
        let mut reader = self.reader.lock().await;
        loop {
            match reader.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(text.as_bytes().to_vec()),
                Some(Ok(WsMessage::Binary(bytes))) => return Ok(bytes.to_vec()),
                Some(Ok(WsMessage::Close(_))) | None => return Err(TransportError::ClosedByPeer),
                Some(Ok(WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Frame(_))) => {}
                Some(Err(e)) => return Err(TransportError::WebSocket(Box::new(e))),
            }
        }
    }

    async fn close(&self) -> TransportResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let mut writer = self.writer.lock().await;
        let _ = writer.send(WsMessage::Close(None)).await;
        let _ = writer.close().await;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
