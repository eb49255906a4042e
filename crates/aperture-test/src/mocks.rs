//! Mock implementations for testing (spec §4.3, §4.10).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use aperture_transport::{Transport, TransportError, TransportResult};
use parking_lot::Mutex;
use tokio::sync::Notify;

/// An in-memory [`Transport`] driven entirely by the test: frames queued via
/// [`MockTransport::push_inbound`] are what `receive` yields, and frames
/// passed to `send` are captured for assertion rather than written anywhere.
#[derive(Default)]
pub struct MockTransport {
    inbound: Mutex<VecDeque<Vec<u8>>>,
    outbound: Mutex<Vec<Vec<u8>>>,
    closed: AtomicBool,
    peer_closed: AtomicBool,
    notify: Notify,
}

impl MockTransport {
    /// Create an empty mock transport.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame for the next `receive` call to return.
    pub fn push_inbound(&self, frame: impl Into<Vec<u8>>) {
        self.inbound.lock().push_back(frame.into());
        self.notify.notify_one();
    }

    /// Simulate the peer hanging up: any `receive` with nothing queued
    /// returns [`TransportError::ClosedByPeer`].
    pub fn close_from_peer(&self) {
        self.peer_closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    /// Every frame sent so far, in order.
    #[must_use]
    pub fn sent_frames(&self) -> Vec<Vec<u8>> {
        self.outbound.lock().clone()
    }

    /// Drain and return every frame sent so far.
    pub fn take_sent(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.outbound.lock())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, frame: &[u8]) -> TransportResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::AlreadyClosed);
        }
        self.outbound.lock().push(frame.to_vec());
        Ok(())
    }

    async fn receive(&self) -> TransportResult<Vec<u8>> {
        loop {
            if self.closed.load(Ordering::Acquire) {
                return Err(TransportError::AlreadyClosed);
            }
            if let Some(frame) = self.inbound.lock().pop_front() {
                return Ok(frame);
            }
            if self.peer_closed.load(Ordering::Acquire) {
                return Err(TransportError::ClosedByPeer);
            }
            self.notify.notified().await;
        }
    }

    async fn close(&self) -> TransportResult<()> {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_waiters();
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
    async fn queued_inbound_frame_is_returned_in_order() {
        let transport = MockTransport::new();
        transport.push_inbound(b"first".to_vec());
        transport.push_inbound(b"second".to_vec());
        assert_eq!(transport.receive().await.unwrap(), b"first");
        assert_eq!(transport.receive().await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn sent_frames_are_captured_for_assertion() {
        let transport = MockTransport::new();
        transport.send(b"hello").await.unwrap();
        assert_eq!(transport.sent_frames(), vec![b"hello".to_vec()]);
    }

    #[tokio::test]
    async fn receive_after_close_reports_already_closed() {
        let transport = MockTransport::new();
        transport.close().await.unwrap();
        let err = transport.receive().await.unwrap_err();
        assert!(matches!(err, TransportError::AlreadyClosed));
    }

    #[tokio::test]
    async fn receive_with_empty_queue_after_peer_close_reports_closed_by_peer() {
        let transport = MockTransport::new();
        transport.close_from_peer();
        let err = transport.receive().await.unwrap_err();
        assert!(matches!(err, TransportError::ClosedByPeer));
    }
}
