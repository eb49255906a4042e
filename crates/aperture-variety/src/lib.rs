//! Aperture Variety Engine — operational/environmental gap computation and
//! acquisition trigger emission (spec §4.15).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod config;
pub mod engine;
pub mod error;
pub mod types;

pub use config::VarietyEngineConfig;
pub use engine::VarietyEngine;
pub use error::{VarietyError, VarietyResult};
pub use types::{
    OperationalSnapshot, OperationalVarietySource, TriggerPriority, TriggerReason, VarietySample,
    VarietyTrigger,
};
