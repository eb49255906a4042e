//! The callback a named tick invokes (spec §4.1).

use async_trait::async_trait;

/// Runs once per tick. A new tick for the same name is skipped entirely if
/// the previous call to `on_tick` has not yet returned (spec §4.1
/// "preventing overlap").
#[async_trait]
pub trait TickHandler: Send + Sync {
    /// Handle one firing of the named tick.
    async fn on_tick(&self);
}
