//! Errors raised by the Registry and Router (spec §4.14).

use aperture_core::{CapabilityName, ErrorKind, ServerId};

/// Failures raised while resolving or binding a capability.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No server is bound to the requested capability.
    #[error("capability {0} is not available")]
    CapabilityUnavailable(CapabilityName),
    /// The given server is not currently registered.
    #[error("server {0} is not registered")]
    ServerNotRegistered(ServerId),
}

impl RegistryError {
    /// The canonical [`ErrorKind`] this failure maps onto (spec §7).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CapabilityUnavailable(_) => ErrorKind::CapabilityUnavailable,
            Self::ServerNotRegistered(_) => ErrorKind::ResourceNotFound,
        }
    }
}

/// Failures raised while routing and invoking a [`crate::Task`].
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// The Registry could not resolve the task's capability.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// No live session could be obtained for the chosen server.
    #[error("no live session for server {0}")]
    NoSession(ServerId),
    /// Every eligible server's breaker was open.
    #[error("all servers bound to {0} are circuit-open")]
    AllBreakersOpen(CapabilityName),
    /// The resilience layer (pool, breaker, rate limiter) rejected the call.
    #[error(transparent)]
    Resilience(#[from] aperture_resilience::ResilienceError),
    /// The call reached the server but failed at the protocol layer, after
    /// retries were exhausted.
    #[error("call failed after retries: {0}")]
    Exhausted(#[source] aperture_mcp::McpError),
}

impl RouterError {
    /// The canonical [`ErrorKind`] this failure maps onto (spec §7).
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Registry(err) => err.kind(),
            Self::NoSession(_) => ErrorKind::TransportError,
            Self::AllBreakersOpen(_) => ErrorKind::CircuitOpen,
            Self::Resilience(err) => err.kind(),
            Self::Exhausted(err) => err.kind(),
        }
    }
}

/// Result alias for registry lookups.
pub type RegistryResult<T> = Result<T, RegistryError>;
/// Result alias for router invocations.
pub type RouterResult<T> = Result<T, RouterError>;
