//! Dead-letter queue: bounded FIFO of failed calls, persisted to disk so a
//! restart does not lose recent failures (spec §4.8).

use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;

use aperture_core::{CapabilityName, DlqEntryId, ErrorKind, ServerId, Timestamp};
use aperture_storage::{KvStore, ScopedKvStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ResilienceError, ResilienceResult};

const NAMESPACE: &str = "dlq:entries";

/// One failed call, retained for operator inspection or replay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DlqEntry {
    /// Identifies this entry.
    pub id: DlqEntryId,
    /// The server the call targeted.
    pub server_id: ServerId,
    /// The capability being invoked.
    pub capability: CapabilityName,
    /// The MCP method called, e.g. `"tools/call"`.
    pub method: String,
    /// The call's parameters, for replay.
    pub params: Value,
    /// The classified failure that landed this entry in the DLQ.
    pub error_kind: ErrorKind,
    /// Human-readable cause.
    pub message: String,
    /// When the entry was added.
    pub enqueued_at: Timestamp,
}

/// Queue depth and capacity, for the admin surface.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DlqStats {
    /// Current number of entries.
    pub len: usize,
    /// Maximum number of entries retained before FIFO eviction begins.
    pub capacity: usize,
}

/// Bounded FIFO of [`DlqEntry`], persisted to a [`ScopedKvStore`].
///
/// When full, adding a new entry evicts the oldest. `retry` re-executes the
/// stored call through a caller-supplied replay closure (the normal Router
/// path, once bound) and removes the entry only on success.
pub struct DeadLetterQueue {
    store: ScopedKvStore,
    capacity: usize,
    order: Mutex<VecDeque<DlqEntryId>>,
}

impl DeadLetterQueue {
    /// Open (or recover) a dead-letter queue backed by `store`, bounded to
    /// `capacity` entries.
    ///
    /// # Errors
    /// Returns an error if existing entries cannot be read back.
    pub async fn open(store: Arc<dyn KvStore>, capacity: usize) -> ResilienceResult<Self> {
        let scoped = ScopedKvStore::new(store, NAMESPACE)?;
        let mut existing: Vec<DlqEntry> = Vec::new();
        for key in scoped.list_keys().await? {
            if let Some(entry) = scoped.get_json::<DlqEntry>(&key).await? {
                existing.push(entry);
            }
        }
        existing.sort_by_key(|e| e.enqueued_at);
        let order = existing.into_iter().map(|e| e.id).collect();
        Ok(Self { store: scoped, capacity, order: Mutex::new(order) })
    }

    /// Add a failed call to the queue, evicting the oldest entry if the
    /// queue is already at capacity.
    ///
    /// # Errors
    /// Returns an error if persisting the entry fails.
    pub async fn add(&self, entry: DlqEntry) -> ResilienceResult<DlqEntryId> {
        let evicted = {
            let mut order = self.order.lock();
            let evicted = if order.len() >= self.capacity { order.pop_front() } else { None };
            order.push_back(entry.id);
            evicted
        };
        if let Some(evicted_id) = evicted {
            self.store.delete(&evicted_id.to_string()).await?;
        }
        self.store.set_json(&entry.id.to_string(), &entry).await?;
        tracing::warn!(entry_id = %entry.id, server_id = %entry.server_id, kind = ?entry.error_kind, "call moved to dead-letter queue");
        Ok(entry.id)
    }

    /// List every entry currently retained, in enqueue order.
    ///
    /// # Errors
    /// Returns an error if a stored entry cannot be deserialized.
    pub async fn list(&self) -> ResilienceResult<Vec<DlqEntry>> {
        let ids: Vec<DlqEntryId> = self.order.lock().iter().copied().collect();
        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entry) = self.store.get_json::<DlqEntry>(&id.to_string()).await? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    /// Re-execute the stored call via `replay`; removes the entry on
    /// success and leaves it in place on failure.
    ///
    /// # Errors
    /// Returns [`ResilienceError::EntryNotFound`] if `entry_id` is absent,
    /// or propagates `replay`'s error via `E`.
    pub async fn retry<E, Replay, Fut>(&self, entry_id: DlqEntryId, replay: Replay) -> Result<(), E>
    where
        Replay: FnOnce(DlqEntry) -> Fut,
        Fut: Future<Output = Result<(), E>>,
        E: From<ResilienceError>,
    {
        let entry = self
            .store
            .get_json::<DlqEntry>(&entry_id.to_string())
            .await
            .map_err(ResilienceError::Storage)
            .map_err(E::from)?
            .ok_or(ResilienceError::EntryNotFound)
            .map_err(E::from)?;

        replay(entry).await?;
        self.purge(entry_id).await.map_err(E::from)?;
        Ok(())
    }

    /// Remove an entry without replaying it.
    ///
    /// # Errors
    /// Returns an error if the store write fails.
    pub async fn purge(&self, entry_id: DlqEntryId) -> ResilienceResult<()> {
        self.order.lock().retain(|id| *id != entry_id);
        self.store.delete(&entry_id.to_string()).await?;
        Ok(())
    }

    /// Current depth and configured capacity.
    #[must_use]
    pub fn stats(&self) -> DlqStats {
        DlqStats { len: self.order.lock().len(), capacity: self.capacity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aperture_storage::MemoryKvStore;

    fn sample_entry() -> DlqEntry {
        DlqEntry {
            id: DlqEntryId::new(),
            server_id: ServerId::new(),
            capability: CapabilityName::new("filesystem"),
            method: "tools/call".into(),
            params: Value::Null,
            error_kind: ErrorKind::TransportError,
            message: "connection reset".into(),
            enqueued_at: Timestamp::now(),
        }
    }

    #[tokio::test]
    async fn add_and_list_round_trips() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let dlq = DeadLetterQueue::open(store, 10).await.unwrap();
        let entry = sample_entry();
        let id = entry.id;
        dlq.add(entry).await.unwrap();
        let listed = dlq.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(dlq.stats().len, 1);
    }

    #[tokio::test]
    async fn evicts_oldest_when_full() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let dlq = DeadLetterQueue::open(store, 1).await.unwrap();
        let first = sample_entry();
        let first_id = first.id;
        dlq.add(first).await.unwrap();
        let second = sample_entry();
        let second_id = second.id;
        dlq.add(second).await.unwrap();

        let listed = dlq.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, second_id);
        assert!(dlq.purge(first_id).await.is_ok());
    }

    #[tokio::test]
    async fn retry_removes_entry_on_success() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let dlq = DeadLetterQueue::open(store, 10).await.unwrap();
        let entry = sample_entry();
        let id = entry.id;
        dlq.add(entry).await.unwrap();

        dlq.retry::<ResilienceError, _, _>(id, |_entry| async { Ok(()) }).await.unwrap();
        assert_eq!(dlq.stats().len, 0);
    }
}
