//! Aperture Discovery — parallel catalog fan-out, merge/dedup, and weighted
//! ranking (spec §4.10).
//!
//! The [`DiscoveryEngine`] depends only on the [`CatalogAdapter`] trait;
//! concrete catalogs are wired in by the daemon binary from configuration.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod adapter;
pub mod engine;
pub mod error;
pub mod ranking;
pub mod types;

pub use adapter::{CatalogAdapter, HttpCatalogAdapter};
pub use engine::DiscoveryEngine;
pub use error::{DiscoveryError, DiscoveryResult};
pub use types::{CandidateSignals, DiscoveryQuery, Priority, RankedCandidate, ServerCandidate};
