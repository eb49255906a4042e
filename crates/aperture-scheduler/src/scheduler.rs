//! Named periodic tick driver (spec §4.1).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::{SchedulerError, SchedulerResult};
use crate::handler::TickHandler;

struct TickEntry {
    interval: Duration,
    paused: AtomicBool,
    wake: Notify,
    cancel: CancellationToken,
}

/// Drives named periodic ticks (`variety`, `health`, `cleanup`, ...).
///
/// Each registered tick owns exactly one spawned task that loops serially
/// between firings, so a handler can never overlap with itself: the next
/// sleep only starts once `on_tick` has returned (spec §4.1 "preventing
/// overlap"). The scheduler keeps no state on disk; a restart forgets every
/// registration.
#[derive(Clone)]
pub struct Scheduler {
    ticks: Arc<DashMap<String, Arc<TickEntry>>>,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// Build an empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self { ticks: Arc::new(DashMap::new()) }
    }

    /// Register a new named tick firing every `interval`, starting with a
    /// full `interval` of delay before the first firing.
    ///
    /// # Errors
    /// Returns [`SchedulerError::AlreadyRegistered`] if `name` is already
    /// registered.
    pub fn register(
        &self,
        name: impl Into<String>,
        interval: Duration,
        handler: Arc<dyn TickHandler>,
    ) -> SchedulerResult<()> {
        let name = name.into();
        if self.ticks.contains_key(&name) {
            return Err(SchedulerError::AlreadyRegistered(name));
        }

        let entry = Arc::new(TickEntry {
            interval,
            paused: AtomicBool::new(false),
            wake: Notify::new(),
            cancel: CancellationToken::new(),
        });
        self.ticks.insert(name.clone(), Arc::clone(&entry));
        tokio::spawn(run_loop(name, entry, handler));
        Ok(())
    }

    /// Suspend firings of `name` until [`Scheduler::resume`] is called. A
    /// pending sleep still elapses on schedule; it is simply a no-op while
    /// paused.
    ///
    /// # Errors
    /// Returns [`SchedulerError::UnknownTick`] if `name` is not registered.
    pub fn pause(&self, name: &str) -> SchedulerResult<()> {
        let entry = self.entry(name)?;
        entry.paused.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Resume firings of `name` previously suspended by [`Scheduler::pause`].
    ///
    /// # Errors
    /// Returns [`SchedulerError::UnknownTick`] if `name` is not registered.
    pub fn resume(&self, name: &str) -> SchedulerResult<()> {
        let entry = self.entry(name)?;
        entry.paused.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Wake `name` immediately, out of its normal cadence. The interval
    /// timer resets from the moment the handler returns.
    ///
    /// # Errors
    /// Returns [`SchedulerError::UnknownTick`] if `name` is not registered.
    pub fn fire_now(&self, name: &str) -> SchedulerResult<()> {
        let entry = self.entry(name)?;
        entry.wake.notify_one();
        Ok(())
    }

    /// Stop and forget `name`. Any in-flight firing is allowed to finish.
    ///
    /// # Errors
    /// Returns [`SchedulerError::UnknownTick`] if `name` is not registered.
    pub fn unregister(&self, name: &str) -> SchedulerResult<()> {
        let (_, entry) = self.ticks.remove(name).ok_or_else(|| SchedulerError::UnknownTick(name.to_string()))?;
        entry.cancel.cancel();
        Ok(())
    }

    /// Stop and forget every registered tick.
    pub fn stop_all(&self) {
        for entry in self.ticks.iter() {
            entry.cancel.cancel();
        }
        self.ticks.clear();
    }

    /// Number of currently registered ticks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// Whether no ticks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    fn entry(&self, name: &str) -> SchedulerResult<Arc<TickEntry>> {
        self.ticks.get(name).map(|e| Arc::clone(&e)).ok_or_else(|| SchedulerError::UnknownTick(name.to_string()))
    }
}

async fn run_loop(name: String, entry: Arc<TickEntry>, handler: Arc<dyn TickHandler>) {
    loop {
        tokio::select! {
            () = entry.cancel.cancelled() => {
                debug!(tick = %name, "scheduler tick unregistered");
                return;
            }
            () = tokio::time::sleep(entry.interval) => {}
            () = entry.wake.notified() => {}
        }

        if entry.cancel.is_cancelled() {
            return;
        }
        if entry.paused.load(Ordering::SeqCst) {
            continue;
        }

        debug!(tick = %name, "firing tick");
        handler.on_tick().await;
        if entry.cancel.is_cancelled() {
            warn!(tick = %name, "tick unregistered mid-handler, not rescheduling");
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::time::advance;

    use super::*;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TickHandler for CountingHandler {
        async fn on_tick(&self) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn tick_fires_on_its_interval() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        scheduler
            .register("health", Duration::from_secs(1), Arc::new(CountingHandler { count: Arc::clone(&count) }))
            .unwrap();

        advance(Duration::from_millis(1100)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        advance(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn paused_tick_does_not_fire() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        scheduler
            .register("health", Duration::from_secs(1), Arc::new(CountingHandler { count: Arc::clone(&count) }))
            .unwrap();
        scheduler.pause("health").unwrap();

        advance(Duration::from_secs(3)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        scheduler.resume("health").unwrap();
        advance(Duration::from_secs(1)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn fire_now_wakes_before_the_interval_elapses() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        scheduler
            .register("cleanup", Duration::from_secs(60), Arc::new(CountingHandler { count: Arc::clone(&count) }))
            .unwrap();

        scheduler.fire_now("cleanup").unwrap();
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn registering_the_same_name_twice_fails() {
        let scheduler = Scheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        scheduler
            .register("health", Duration::from_secs(1), Arc::new(CountingHandler { count: Arc::clone(&count) }))
            .unwrap();
        let err = scheduler
            .register("health", Duration::from_secs(1), Arc::new(CountingHandler { count }))
            .unwrap_err();
        assert!(matches!(err, SchedulerError::AlreadyRegistered(_)));
    }

    #[test]
    fn controlling_an_unknown_tick_fails_without_a_runtime() {
        let scheduler = Scheduler::new();
        assert!(matches!(scheduler.pause("ghost"), Err(SchedulerError::UnknownTick(_))));
        assert!(matches!(scheduler.resume("ghost"), Err(SchedulerError::UnknownTick(_))));
        assert!(matches!(scheduler.fire_now("ghost"), Err(SchedulerError::UnknownTick(_))));
        assert!(matches!(scheduler.unregister("ghost"), Err(SchedulerError::UnknownTick(_))));
    }
}
