//! Aperture Events — in-process broadcast bus carrying daemon lifecycle events.
//!
//! Lets the admin surface and the audit log observe breaker transitions, variety
//! samples, job phase changes, and registry churn without coupling any of the
//! five core subsystems to those observers.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod bus;
mod event;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventReceiver};
pub use event::{ApertureEvent, BreakerState, JobPhase};
