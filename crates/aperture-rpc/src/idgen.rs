//! Outgoing request id generation.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::message::RpcId;

/// Hands out strictly increasing numeric ids for outgoing requests.
///
/// One instance is owned per MCP client session (spec §4.4); ids are only
/// required to be unique within that session, not globally.
#[derive(Debug, Default)]
pub struct RpcIdGenerator {
    next: AtomicI64,
}

impl RpcIdGenerator {
    /// Start a generator at id `1`.
    #[must_use]
    pub fn new() -> Self {
        Self { next: AtomicI64::new(1) }
    }

    /// Produce the next id.
    pub fn next_id(&self) -> RpcId {
        RpcId::Number(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_strictly_increasing() {
        let gen = RpcIdGenerator::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert_ne!(a, b);
    }
}
