//! Newtype identifiers.
//!
//! Every long-lived entity in the daemon is referenced by an opaque id rather than
//! a shared pointer, per the cross-reference resolution in the design notes: the
//! Supervisor, Registry, and Router never hold each other, only `ServerId` values.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

macro_rules! uuid_id {
    ($name:ident, $doc:literal) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(uuid::Uuid);

        impl $name {
            /// Mint a fresh, random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(uuid::Uuid::new_v4())
            }

            /// Expose the underlying UUID, e.g. for log fields.
            #[must_use]
            pub fn as_uuid(&self) -> uuid::Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

uuid_id!(ServerId, "Identifies one live `ServerProcess` owned by the Supervisor.");
uuid_id!(InstallId, "Identifies one `Installation` produced by the Installer.");
uuid_id!(JobId, "Identifies one `AcquisitionJob` tracked by the Orchestrator.");
uuid_id!(DlqEntryId, "Identifies one entry in the dead-letter queue.");

/// A capability name, e.g. `filesystem` or `presentation_generation`.
///
/// Interned as a plain `String` rather than an enum: the set of capabilities is
/// open-ended and discovered at runtime, not known at compile time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CapabilityName(String);

impl CapabilityName {
    /// Wrap a capability name, trimming incidental whitespace.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    /// Borrow the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CapabilityName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CapabilityName {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// A JSON-RPC request identifier, unique within one [`aperture_rpc`]-level session.
///
/// A monotonic counter per session is sufficient per §4.2; this wraps the counter
/// in a type so callers cannot confuse it with a plain `u64` elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(u64);

impl RequestId {
    /// Wrap a raw counter value.
    #[must_use]
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Expose the raw counter value, e.g. for wire encoding.
    #[must_use]
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic generator for [`RequestId`] values, one per MCP Client session.
///
/// A plain `AtomicU64` counter is sufficient: ids only need to be unique within
/// the session that allocated them (§4.2), never globally.
#[derive(Debug, Default)]
pub struct RequestIdGenerator {
    next: AtomicU64,
}

impl RequestIdGenerator {
    /// Create a generator starting at 1 (0 is reserved to make "unset" detectable).
    #[must_use]
    pub fn new() -> Self {
        Self { next: AtomicU64::new(1) }
    }

    /// Allocate the next id. Safe to call from multiple tasks concurrently.
    pub fn next(&self) -> RequestId {
        RequestId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_unique_and_monotonic() {
        let gen = RequestIdGenerator::new();
        let a = gen.next();
        let b = gen.next();
        assert!(b.as_raw() > a.as_raw());
    }

    #[test]
    fn capability_name_trims_whitespace() {
        let name = CapabilityName::new("  filesystem  ");
        assert_eq!(name.as_str(), "filesystem");
    }
}
