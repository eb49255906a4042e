//! Aperture Registry — the Capability Registry and Router: capability-to-
//! server bindings, call routing, and resilience composition (spec §4.14).

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod error;
pub mod registry;
pub mod router;
pub mod session;
pub mod types;

pub use error::{RegistryError, RegistryResult, RouterError, RouterResult};
pub use registry::Registry;
pub use router::{Router, RouterConfig};
pub use session::ServerSessionProvider;
pub use types::{RegisteredServer, RouteOutcome, RouteTarget, Task};
