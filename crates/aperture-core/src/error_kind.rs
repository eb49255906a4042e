//! The canonical error taxonomy (spec §7).
//!
//! Every crate in this workspace owns its own `thiserror` error enum, but each
//! variant ultimately carries or maps onto one of these kinds so that the Router,
//! the DLQ, and operator-facing diagnostics can classify a failure without caring
//! which layer produced it.

use serde::{Deserialize, Serialize};

/// A canonical error classification, shared by every component boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed JSON-RPC payload; never retried.
    ParseError,
    /// Structural violation of the JSON-RPC envelope; never retried.
    InvalidRequest,
    /// The target does not advertise the requested method.
    MethodNotFound,
    /// The target does not advertise the requested tool.
    ToolNotFound,
    /// Arguments did not match the advertised schema; never retried.
    InvalidParams,
    /// Connection drop or framing failure; retried per policy, counts toward breaker.
    TransportError,
    /// Deadline exceeded; retried per policy, counts toward breaker.
    Timeout,
    /// Local or remote throttling; retried after the hint, does not count toward breaker.
    RateLimited,
    /// Breaker is open and is failing fast; never retried by the caller.
    CircuitOpen,
    /// A pool or child-process cap was hit; caller may back off.
    CapacityExhausted,
    /// No ready server is bound to the requested capability.
    CapabilityUnavailable,
    /// The acquisition pipeline failed during the `installing` phase.
    InstallFailed,
    /// The acquisition pipeline failed during the `verifying` phase.
    VerifyFailed,
    /// A resource (install directory, DLQ entry, server) was not found.
    ResourceNotFound,
    /// The capability set requested was invalid or inconsistent.
    InvalidCapabilities,
    /// Graceful shutdown is in progress; new work is not admitted.
    ShuttingDown,
    /// A bug or invariant violation; always logged with full context.
    Internal,
}

impl ErrorKind {
    /// Standard JSON-RPC 2.0 and private-range error codes (spec §4.2).
    #[must_use]
    pub fn rpc_code(self) -> i64 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::Internal => -32603,
            Self::TransportError => -32001,
            Self::Timeout => -32002,
            Self::ResourceNotFound => -32003,
            Self::ToolNotFound => -32004,
            Self::InvalidCapabilities => -32005,
            // The remaining kinds are internal classifications that never cross
            // the wire as a JSON-RPC error code of their own; they are carried
            // as strings in diagnostic records instead.
            Self::RateLimited => -32010,
            Self::CircuitOpen => -32011,
            Self::CapacityExhausted => -32012,
            Self::CapabilityUnavailable => -32013,
            Self::InstallFailed => -32014,
            Self::VerifyFailed => -32015,
            Self::ShuttingDown => -32016,
        }
    }

    /// Map a standard or private JSON-RPC error code back onto a kind.
    #[must_use]
    pub fn from_rpc_code(code: i64) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32001 => Self::TransportError,
            -32002 => Self::Timeout,
            -32003 => Self::ResourceNotFound,
            -32004 => Self::ToolNotFound,
            -32005 => Self::InvalidCapabilities,
            -32010 => Self::RateLimited,
            -32011 => Self::CircuitOpen,
            -32012 => Self::CapacityExhausted,
            -32013 => Self::CapabilityUnavailable,
            -32014 => Self::InstallFailed,
            -32015 => Self::VerifyFailed,
            -32016 => Self::ShuttingDown,
            _ => Self::Internal,
        }
    }

    /// Whether this kind is a candidate for the Retry policy (spec §4.7, §7).
    #[must_use]
    pub fn recoverability(self) -> Recoverability {
        match self {
            Self::TransportError | Self::Timeout => Recoverability::Retryable,
            Self::RateLimited => Recoverability::RetryAfterHint,
            Self::ParseError
            | Self::InvalidRequest
            | Self::InvalidParams
            | Self::MethodNotFound
            | Self::ToolNotFound
            | Self::CircuitOpen
            | Self::CapacityExhausted
            | Self::CapabilityUnavailable
            | Self::InstallFailed
            | Self::VerifyFailed
            | Self::ResourceNotFound
            | Self::InvalidCapabilities
            | Self::ShuttingDown
            | Self::Internal => Recoverability::Terminal,
        }
    }

    /// Whether a consecutive occurrence of this kind should count toward a
    /// circuit breaker's failure counter (spec §7 "breaker counts" column).
    #[must_use]
    pub fn counts_toward_breaker(self) -> bool {
        matches!(self, Self::TransportError | Self::Timeout)
    }
}

/// How a caller should respond to a given [`ErrorKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recoverability {
    /// Safe to retry per the configured backoff policy.
    Retryable,
    /// Safe to retry, but only after the target's `retry_after` hint elapses.
    RetryAfterHint,
    /// Retrying will not help; surface to the caller (or fail the job) immediately.
    Terminal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rpc_code_round_trips_for_every_kind() {
        let kinds = [
            ErrorKind::ParseError,
            ErrorKind::InvalidRequest,
            ErrorKind::MethodNotFound,
            ErrorKind::ToolNotFound,
            ErrorKind::InvalidParams,
            ErrorKind::TransportError,
            ErrorKind::Timeout,
            ErrorKind::RateLimited,
            ErrorKind::CircuitOpen,
            ErrorKind::CapacityExhausted,
            ErrorKind::CapabilityUnavailable,
            ErrorKind::InstallFailed,
            ErrorKind::VerifyFailed,
            ErrorKind::ResourceNotFound,
            ErrorKind::InvalidCapabilities,
            ErrorKind::ShuttingDown,
        ];
        for kind in kinds {
            assert_eq!(ErrorKind::from_rpc_code(kind.rpc_code()), kind);
        }
    }

    #[test]
    fn unknown_code_maps_to_internal() {
        assert_eq!(ErrorKind::from_rpc_code(-1), ErrorKind::Internal);
    }

    #[test]
    fn only_transport_and_timeout_count_toward_breaker() {
        assert!(ErrorKind::TransportError.counts_toward_breaker());
        assert!(ErrorKind::Timeout.counts_toward_breaker());
        assert!(!ErrorKind::RateLimited.counts_toward_breaker());
        assert!(!ErrorKind::CircuitOpen.counts_toward_breaker());
    }
}
