//! The `PendingRequest` table (spec §3, §4.4, §8 property 1).
//!
//! Exactly one terminal outcome — response, error, timeout, or session close
//! — reaches each waiter, and removal from the table is idempotent: whichever
//! of [`PendingRequestTable::resolve`], [`PendingRequestTable::expire`], or
//! [`PendingRequestTable::cancel`] runs first wins; the loser finds the slot
//! already gone and does nothing.

use std::collections::HashMap;
use std::time::Instant;

use aperture_rpc::{RpcError, RpcId};
use parking_lot::Mutex;
use tokio::sync::oneshot;

use crate::error::McpError;

/// The terminal outcome delivered to a caller waiting on one request.
pub type PendingOutcome = Result<serde_json::Value, McpError>;

struct Slot {
    method: &'static str,
    deadline: Instant,
    waiter: oneshot::Sender<PendingOutcome>,
}

/// A session's table of in-flight requests, keyed by [`RpcId`].
///
/// Invariant (spec §3 `PendingRequest`): at most one [`Slot`] exists per id
/// at a time, and it is removed exactly once, by whichever resolution path
/// reaches it first.
#[derive(Default)]
pub struct PendingRequestTable {
    slots: Mutex<HashMap<RpcId, Slot>>,
}

impl PendingRequestTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new in-flight request, returning the receiving half the
    /// caller should await.
    pub fn insert(
        &self,
        id: RpcId,
        method: &'static str,
        deadline: Instant,
    ) -> oneshot::Receiver<PendingOutcome> {
        let (tx, rx) = oneshot::channel();
        self.slots.lock().insert(id, Slot { method, deadline, waiter: tx });
        rx
    }

    /// Deliver a successful result to the waiter for `id`, if still pending.
    pub fn resolve_success(&self, id: &RpcId, result: serde_json::Value) {
        self.complete(id, Ok(result));
    }

    /// Deliver a server-returned error to the waiter for `id`, if still pending.
    pub fn resolve_error(&self, id: &RpcId, error: RpcError) {
        self.complete(id, Err(McpError::ServerError(error)));
    }

    fn complete(&self, id: &RpcId, outcome: PendingOutcome) {
        let slot = self.slots.lock().remove(id);
        if let Some(slot) = slot {
            let _ = slot.waiter.send(outcome);
        }
    }

    /// Remove and fail one overdue request by id, delivering
    /// [`McpError::Timeout`]. Idempotent: a no-op if `id` is no longer
    /// present (e.g. the response arrived first).
    pub fn expire(&self, id: &RpcId) {
        self.complete(id, Err(McpError::Timeout));
    }

    /// Remove and fail every request whose deadline has passed, returning how
    /// many were expired.
    pub fn expire_overdue(&self, now: Instant) -> usize {
        let overdue: Vec<RpcId> = {
            let slots = self.slots.lock();
            slots.iter().filter(|(_, slot)| slot.deadline <= now).map(|(id, _)| id.clone()).collect()
        };
        for id in &overdue {
            self.complete(id, Err(McpError::Timeout));
        }
        overdue.len()
    }

    /// Cancel one in-flight request immediately, delivering
    /// [`McpError::Cancelled`] to its waiter.
    ///
    /// Returns the method name of the cancelled request, for the best-effort
    /// `notifications/cancelled` notification (spec §4.4).
    pub fn cancel(&self, id: &RpcId) -> Option<&'static str> {
        let slot = self.slots.lock().remove(id);
        slot.map(|slot| {
            let method = slot.method;
            let _ = slot.waiter.send(Err(McpError::Cancelled));
            method
        })
    }

    /// Remove and fail every pending request with a transport error, e.g. on
    /// disconnect (spec §4.4 reconnect).
    pub fn fail_all_with_transport_error(&self, error: aperture_transport::TransportError) {
        let ids: Vec<RpcId> = self.slots.lock().keys().cloned().collect();
        for id in ids {
            self.complete(&id, Err(McpError::Transport(clone_transport_error(&error))));
        }
    }

    /// Number of requests currently in flight.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.lock().len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// [`aperture_transport::TransportError`] does not implement `Clone` (it
/// wraps `std::io::Error`), so a shared disconnect reason is re-described
/// per recipient rather than cloned.
fn clone_transport_error(error: &aperture_transport::TransportError) -> aperture_transport::TransportError {
    match error {
        aperture_transport::TransportError::ClosedByPeer => aperture_transport::TransportError::ClosedByPeer,
        aperture_transport::TransportError::AlreadyClosed => aperture_transport::TransportError::AlreadyClosed,
        other => aperture_transport::TransportError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn resolve_delivers_to_waiter_and_empties_table() {
        let table = PendingRequestTable::new();
        let id = RpcId::Number(1);
        let rx = table.insert(id.clone(), "tools/call", Instant::now() + Duration::from_secs(5));
        table.resolve_success(&id, serde_json::json!({"ok": true}));
        let outcome = rx.await.unwrap().unwrap();
        assert_eq!(outcome, serde_json::json!({"ok": true}));
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn expiring_an_overdue_request_delivers_timeout() {
        let table = PendingRequestTable::new();
        let id = RpcId::Number(1);
        let rx = table.insert(id, "tools/call", Instant::now() - Duration::from_millis(1));
        let expired = table.expire_overdue(Instant::now());
        assert_eq!(expired, 1);
        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, Err(McpError::Timeout)));
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let table = PendingRequestTable::new();
        let id = RpcId::Number(1);
        let rx = table.insert(id.clone(), "tools/call", Instant::now() + Duration::from_secs(5));
        table.resolve_success(&id, serde_json::json!(1));
        // A second resolution attempt on the same id finds nothing to do.
        table.resolve_success(&id, serde_json::json!(2));
        let outcome = rx.await.unwrap().unwrap();
        assert_eq!(outcome, serde_json::json!(1));
    }

    #[tokio::test]
    async fn cancel_removes_and_fails_the_waiter() {
        let table = PendingRequestTable::new();
        let id = RpcId::Number(1);
        let rx = table.insert(id.clone(), "tools/call", Instant::now() + Duration::from_secs(5));
        let method = table.cancel(&id);
        assert_eq!(method, Some("tools/call"));
        assert!(matches!(rx.await.unwrap(), Err(McpError::Cancelled)));
        assert!(table.is_empty());
    }
}
