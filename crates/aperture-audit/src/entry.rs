//! Diagnostic record types and hash-chain linking.
//!
//! Every acquisition-job terminal outcome and every Supervisor escalation
//! (spec §4.13 failure ladder) is appended as a [`DiagnosticRecord`], never
//! mutated afterward. Records are chain-linked — each carries the hash of
//! its predecessor — so operators can detect a truncated or edited log
//! without needing a second integrity store.

use aperture_core::{JobId, ServerId, Timestamp};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A sha256 content hash, hex-encoded for storage and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// The hash used to link the very first entry in a chain.
    #[must_use]
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Hash arbitrary bytes.
    #[must_use]
    pub fn hash(data: &[u8]) -> Self {
        let digest = Sha256::digest(data);
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Wrap an already-computed 32-byte digest, e.g. one read back off disk.
    #[must_use]
    pub fn from_raw(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// What happened, for one diagnostic record (spec §3.1 `DiagnosticRecord`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DiagnosticEvent {
    /// An acquisition job reached its terminal `done` phase.
    AcquisitionSucceeded {
        /// The job that completed.
        job_id: JobId,
        /// The capability it acquired.
        capability: String,
        /// The server that now backs the capability.
        server_id: ServerId,
    },
    /// An acquisition job reached its terminal `failed` phase.
    AcquisitionFailed {
        /// The job that failed.
        job_id: JobId,
        /// The capability it was trying to acquire.
        capability: String,
        /// The phase the failure occurred in, e.g. `"installing"`.
        phase: String,
        /// The classified error kind, per the error taxonomy (spec §7).
        error_kind: String,
        /// Human-readable cause.
        cause: String,
    },
    /// The Supervisor advanced one rung of its failure escalation ladder
    /// (spec §4.13): reconnect, graceful restart, forced restart, reinstall,
    /// or final `failed` + operator alert.
    SupervisorEscalated {
        /// The server the escalation applies to.
        server_id: ServerId,
        /// The rung reached, e.g. `"forced_restart"` or `"marked_failed"`.
        rung: String,
        /// Number of consecutive missed health checks that triggered this.
        consecutive_failures: u32,
    },
    /// An operator-facing alert was raised (escalation ladder's final rung).
    OperatorAlert {
        /// The server the alert concerns.
        server_id: ServerId,
        /// Human-readable alert message.
        message: String,
    },
}

/// One append-only entry in the diagnostic log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    /// When the record was appended.
    pub at: Timestamp,
    /// The event being recorded.
    pub event: DiagnosticEvent,
    /// Hash of the immediately preceding record ([`ContentHash::zero`] for
    /// the first record ever appended).
    pub previous_hash: ContentHash,
}

impl DiagnosticRecord {
    /// Build a new record linked to `previous_hash`.
    #[must_use]
    pub fn new(event: DiagnosticEvent, previous_hash: ContentHash) -> Self {
        Self { at: Timestamp::now(), event, previous_hash }
    }

    /// The data used to compute this record's own content hash — everything
    /// except the hash field itself, so the chain can be walked forward.
    #[must_use]
    pub fn signing_data(&self) -> Vec<u8> {
        let mut data = self.previous_hash.0.to_vec();
        data.extend_from_slice(&self.at.as_millis().to_le_bytes());
        if let Ok(event_json) = serde_json::to_vec(&self.event) {
            data.extend_from_slice(&event_json);
        }
        data
    }

    /// This record's own content hash, used as the `previous_hash` of the
    /// next record appended.
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::hash(&self.signing_data())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_is_deterministic() {
        let a = ContentHash::hash(b"payload");
        let b = ContentHash::hash(b"payload");
        assert_eq!(a, b);
    }

    #[test]
    fn different_payloads_hash_differently() {
        assert_ne!(ContentHash::hash(b"a"), ContentHash::hash(b"b"));
    }

    #[test]
    fn chain_links_advance() {
        let first = DiagnosticRecord::new(
            DiagnosticEvent::OperatorAlert {
                server_id: aperture_core::ServerId::new(),
                message: "test".into(),
            },
            ContentHash::zero(),
        );
        let second = DiagnosticRecord::new(
            DiagnosticEvent::OperatorAlert {
                server_id: aperture_core::ServerId::new(),
                message: "test2".into(),
            },
            first.content_hash(),
        );
        assert_eq!(second.previous_hash, first.content_hash());
    }
}
