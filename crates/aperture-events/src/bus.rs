//! Broadcast event bus.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::trace;

use crate::event::ApertureEvent;

/// Default channel capacity; lagging subscribers drop the oldest events first.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Broadcasts [`ApertureEvent`]s to every subscriber.
///
/// Cloning an `EventBus` is cheap and shares the same underlying channel, so
/// every subsystem that needs to publish can own a clone without coordination.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Arc<ApertureEvent>>,
}

impl EventBus {
    /// Create a bus with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a bus with an explicit channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event. Returns the number of subscribers that received it;
    /// zero is not an error, it just means nobody is currently listening.
    pub fn publish(&self, event: ApertureEvent) -> usize {
        let event = Arc::new(event);
        match self.sender.send(Arc::clone(&event)) {
            Ok(count) => count,
            Err(_) => {
                trace!(kind = event.kind(), "published event with no subscribers");
                0
            }
        }
    }

    /// Subscribe to the bus.
    #[must_use]
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A receiver obtained from [`EventBus::subscribe`].
#[derive(Debug)]
pub struct EventReceiver {
    receiver: broadcast::Receiver<Arc<ApertureEvent>>,
}

impl EventReceiver {
    /// Await the next event.
    ///
    /// # Errors
    ///
    /// Returns [`broadcast::error::RecvError::Lagged`] if this receiver fell too
    /// far behind and missed events, or `Closed` if every sender was dropped.
    pub async fn recv(&mut self) -> Result<Arc<ApertureEvent>, broadcast::error::RecvError> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aperture_core::Timestamp;

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let sent = ApertureEvent::VarietySampleRecorded {
            at: Timestamp::now(),
            operational: 2.0,
            environmental: 3.0,
            ratio: 2.0 / 3.0,
        };
        bus.publish(sent);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind(), "variety_sample_recorded");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_error() {
        let bus = EventBus::new();
        let count = bus.publish(ApertureEvent::ServerProcessStateChanged {
            at: Timestamp::now(),
            server_id: aperture_core::ServerId::new(),
            state: "ready".to_string(),
        });
        assert_eq!(count, 0);
    }
}
