//! Aperture Scheduler — the named periodic tick driver behind the Variety,
//! health, and cleanup loops (spec §4.1).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod handler;
pub mod scheduler;

pub use error::{SchedulerError, SchedulerResult};
pub use handler::TickHandler;
pub use scheduler::Scheduler;
