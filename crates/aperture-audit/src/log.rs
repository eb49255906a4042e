//! The append-only diagnostic log itself.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use aperture_storage::{KvStore, ScopedKvStore};
use tracing::info;

use crate::entry::{ContentHash, DiagnosticEvent, DiagnosticRecord};
use crate::error::{AuditError, AuditResult};

const NAMESPACE: &str = "audit:log";
const HEAD_KEY: &str = "__chain_head__";

/// Append-only, hash-chained diagnostic log.
///
/// Records are stored under their sequence number (`"00000000000000000042"`,
/// zero-padded so lexicographic key order matches append order) plus a
/// `__chain_head__` pointer to the hash of the last-appended record.
pub struct AuditLog {
    store: ScopedKvStore,
    next_seq: AtomicU64,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").finish_non_exhaustive()
    }
}

fn seq_key(seq: u64) -> String {
    format!("{seq:020}")
}

impl AuditLog {
    /// Open (or create) a diagnostic log backed by `store`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read while recovering the
    /// current sequence number.
    pub async fn open(store: Arc<dyn KvStore>) -> AuditResult<Self> {
        let scoped = ScopedKvStore::new(store, NAMESPACE).map_err(AuditError::Storage)?;
        let existing = scoped.list_keys().await?;
        let next_seq = existing
            .iter()
            .filter(|k| k.as_str() != HEAD_KEY)
            .filter_map(|k| k.parse::<u64>().ok())
            .max()
            .map_or(0, |last| last + 1);
        Ok(Self { store: scoped, next_seq: AtomicU64::new(next_seq) })
    }

    /// Append a new event, linking it to the current chain head.
    ///
    /// # Errors
    /// Returns an error if the chain head cannot be read or the record
    /// cannot be persisted.
    pub async fn append(&self, event: DiagnosticEvent) -> AuditResult<DiagnosticRecord> {
        let previous_hash = self.chain_head().await?;
        let record = DiagnosticRecord::new(event, previous_hash);
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);

        self.store.set_json(&seq_key(seq), &record).await.map_err(AuditError::Storage)?;
        self.store
            .set(HEAD_KEY, record.content_hash().to_string().into_bytes())
            .await
            .map_err(AuditError::Storage)?;

        info!(seq, kind = ?record.event, "diagnostic record appended");
        Ok(record)
    }

    /// The hash of the last-appended record, or [`ContentHash::zero`] if the
    /// log is empty.
    ///
    /// # Errors
    /// Returns an error if the store read fails.
    pub async fn chain_head(&self) -> AuditResult<ContentHash> {
        let Some(bytes) = self.store.get(HEAD_KEY).await.map_err(AuditError::Storage)? else {
            return Ok(ContentHash::zero());
        };
        let hex_str =
            std::str::from_utf8(&bytes).map_err(|e| AuditError::Serialization(e.to_string()))?;
        let mut out = [0u8; 32];
        let decoded = hex::decode(hex_str).map_err(|e| AuditError::Serialization(e.to_string()))?;
        if decoded.len() != 32 {
            return Err(AuditError::Serialization("chain head is not 32 bytes".into()));
        }
        out.copy_from_slice(&decoded);
        Ok(ContentHash::from_raw(out))
    }

    /// Read every record, in append order.
    ///
    /// # Errors
    /// Returns an error if a stored record fails to deserialize.
    pub async fn replay(&self) -> AuditResult<Vec<DiagnosticRecord>> {
        let mut keys = self.store.list_keys().await.map_err(AuditError::Storage)?;
        keys.retain(|k| k != HEAD_KEY);
        keys.sort();

        let mut records = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(record) = self
                .store
                .get_json::<DiagnosticRecord>(&key)
                .await
                .map_err(AuditError::Storage)?
            {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Verify that every record's `previous_hash` matches the actual hash of
    /// its predecessor.
    ///
    /// # Errors
    /// Returns [`AuditError::ChainBroken`] at the first mismatch.
    pub async fn verify_chain(&self) -> AuditResult<()> {
        let records = self.replay().await?;
        let mut expected = ContentHash::zero();
        for (i, record) in records.iter().enumerate() {
            if record.previous_hash != expected {
                return Err(AuditError::ChainBroken {
                    entry_id: i.to_string(),
                    expected: expected.to_string(),
                    actual: record.previous_hash.to_string(),
                });
            }
            expected = record.content_hash();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aperture_core::ServerId;
    use aperture_storage::MemoryKvStore;

    fn alert(msg: &str) -> DiagnosticEvent {
        DiagnosticEvent::OperatorAlert { server_id: ServerId::new(), message: msg.into() }
    }

    #[tokio::test]
    async fn appended_records_chain_correctly() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        let log = AuditLog::open(store).await.unwrap();

        log.append(alert("one")).await.unwrap();
        log.append(alert("two")).await.unwrap();
        log.append(alert("three")).await.unwrap();

        log.verify_chain().await.unwrap();
        assert_eq!(log.replay().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn recovers_sequence_number_after_reopen() {
        let store: Arc<dyn KvStore> = Arc::new(MemoryKvStore::new());
        {
            let log = AuditLog::open(Arc::clone(&store)).await.unwrap();
            log.append(alert("one")).await.unwrap();
        }
        let log = AuditLog::open(store).await.unwrap();
        log.append(alert("two")).await.unwrap();
        assert_eq!(log.replay().await.unwrap().len(), 2);
    }
}
