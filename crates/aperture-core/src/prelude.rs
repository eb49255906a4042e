//! Convenience re-exports for downstream crates.

pub use crate::error_kind::{ErrorKind, Recoverability};
pub use crate::ids::{
    CapabilityName, DlqEntryId, InstallId, JobId, RequestId, RequestIdGenerator, ServerId,
};
pub use crate::retry_math::backoff_delay;
pub use crate::time::Timestamp;
