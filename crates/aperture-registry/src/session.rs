//! Resolves a `server_id` to a live [`McpClient`] session without the
//! Router depending on whichever crate owns process lifecycle (spec §9
//! "Dynamic dispatch... explicit interface type; register concrete
//! implementations at startup").
//!
//! The daemon binds the real implementation — an adapter over the
//! Supervisor's live sessions — at startup; tests and other callers can
//! supply their own.

use aperture_core::ServerId;
use aperture_mcp::McpClient;
use async_trait::async_trait;

/// Looks up the current live session for a supervised server.
///
/// `McpClient` is cheaply `Clone` (it is itself an `Arc`-backed handle), so
/// implementations return an owned clone rather than a borrow.
#[async_trait]
pub trait ServerSessionProvider: Send + Sync {
    /// The live session for `server_id`, or `None` if the server is not
    /// currently `ready`.
    async fn session(&self, server_id: ServerId) -> Option<McpClient>;
}
