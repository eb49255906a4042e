//! Aperture Resilience — circuit breaker, retry, dead-letter queue, rate
//! limiter, and transport session pool (spec §4.5-§4.9).
//!
//! These are independent primitives; the Router (spec §4.14) composes them
//! per call in the order pool → breaker → retry → rate limiter → DLQ.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod breaker;
pub mod dlq;
pub mod error;
pub mod pool;
pub mod rate_limit;
pub mod retry;

pub use breaker::{BreakerConfig, CircuitBreaker};
pub use dlq::{DeadLetterQueue, DlqEntry, DlqStats};
pub use error::{ResilienceError, ResilienceResult};
pub use pool::{PoolConfig, PooledGuard, SessionFactory, SessionPool};
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimiter};
pub use retry::{RetryExhausted, RetryPolicy};
