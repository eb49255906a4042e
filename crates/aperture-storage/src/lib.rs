//! Aperture Storage — embedded persistence for the capability-acquisition daemon.
//!
//! Per spec §6 ("Persisted state"), the daemon needs exactly three things to
//! survive a restart: Installation directory bookkeeping, the dead-letter
//! queue's append-only log, and periodic `VarietySample` snapshots. All three
//! are namespaced records in one [`kv::KvStore`] — there is no relational
//! schema to maintain, so a raw KV tier is sufficient and avoids pulling in a
//! full query engine for three flat record types.
//!
//! [`kv::MemoryKvStore`] backs tests and daemons run with persistence
//! disabled; [`kv::SurrealKvStore`] (behind the `kv` feature, enabled by
//! default) persists to disk via `SurrealKV`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod kv;

pub use error::{StorageError, StorageResult};
pub use kv::{KvEntry, KvStore, MemoryKvStore, ScopedKvStore};

#[cfg(feature = "kv")]
pub use kv::SurrealKvStore;
