//! Per-`server_id` transport session pool (spec §4.5).

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::ResilienceResult;

/// Creates and health-checks pooled sessions. One instance per `server_id`.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    /// The pooled resource type, e.g. a live MCP client session.
    type Session: Send + 'static;

    /// Open a brand-new session.
    async fn create(&self) -> ResilienceResult<Self::Session>;

    /// A lightweight liveness probe run on a session before it re-enters
    /// the pool. `false` discards the session instead of reusing it.
    async fn health_check(&self, session: &Self::Session) -> bool;
}

/// Pool sizing.
#[derive(Debug, Clone, Copy)]
pub struct PoolConfig {
    /// Persistent sessions kept warm.
    pub base_size: usize,
    /// Additional burst sessions allowed beyond `base_size`.
    pub max_overflow: usize,
    /// How long [`SessionPool::acquire`] blocks before giving up.
    pub acquire_deadline: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { base_size: 2, max_overflow: 4, acquire_deadline: Duration::from_secs(5) }
    }
}

/// A bounded pool of sessions for one external server.
///
/// A returned session is health-checked before re-entering the idle queue;
/// an unhealthy session is dropped and the slot freed for a fresh one on
/// the next acquire.
pub struct SessionPool<F: SessionFactory> {
    factory: F,
    idle: Mutex<VecDeque<F::Session>>,
    semaphore: Arc<Semaphore>,
    acquire_deadline: Duration,
}

impl<F: SessionFactory> SessionPool<F> {
    /// Create a pool with `factory` and `config`.
    #[must_use]
    pub fn new(factory: F, config: PoolConfig) -> Arc<Self> {
        Arc::new(Self {
            factory,
            idle: Mutex::new(VecDeque::new()),
            semaphore: Arc::new(Semaphore::new(config.base_size + config.max_overflow)),
            acquire_deadline: config.acquire_deadline,
        })
    }

    /// Acquire a session, blocking up to `acquire_deadline`.
    ///
    /// # Errors
    /// Returns [`crate::ResilienceError::PoolExhausted`] if no slot frees up
    /// in time, or the factory's error if a new session could not be
    /// created.
    pub async fn acquire(self: &Arc<Self>) -> ResilienceResult<PooledGuard<F>> {
        let permit = tokio::time::timeout(
            self.acquire_deadline,
            Arc::clone(&self.semaphore).acquire_owned(),
        )
        .await
        .map_err(|_| crate::ResilienceError::PoolExhausted)?
        .map_err(|_| crate::ResilienceError::PoolExhausted)?;

        let existing = self.idle.lock().pop_front();
        let session = match existing {
            Some(session) => session,
            None => self.factory.create().await?,
        };

        Ok(PooledGuard { pool: Arc::clone(self), session: Some(session), permit: Some(permit) })
    }

    /// Number of sessions currently idle in the pool.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.idle.lock().len()
    }
}

/// A checked-out session. Returning it (by dropping the guard) health-checks
/// it in the background and either returns it to the idle queue or discards
/// it, matching the fire-and-forget release pattern used elsewhere in this
/// workspace for guard teardown.
pub struct PooledGuard<F: SessionFactory> {
    pool: Arc<SessionPool<F>>,
    session: Option<F::Session>,
    permit: Option<OwnedSemaphorePermit>,
}

impl<F: SessionFactory> PooledGuard<F> {
    /// Borrow the underlying session.
    #[must_use]
    pub fn get(&self) -> &F::Session {
        self.session.as_ref().expect("session present until drop")
    }

    /// Mutably borrow the underlying session.
    pub fn get_mut(&mut self) -> &mut F::Session {
        self.session.as_mut().expect("session present until drop")
    }
}

impl<F: SessionFactory> Drop for PooledGuard<F> {
    fn drop(&mut self) {
        let (Some(session), Some(permit)) = (self.session.take(), self.permit.take()) else {
            return;
        };
        let pool = Arc::clone(&self.pool);
        tokio::spawn(async move {
            if pool.factory.health_check(&session).await {
                pool.idle.lock().push_back(session);
            }
            drop(permit);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFactory {
        created: AtomicUsize,
        healthy: bool,
    }

    #[async_trait]
    impl SessionFactory for CountingFactory {
        type Session = usize;

        async fn create(&self) -> ResilienceResult<usize> {
            Ok(self.created.fetch_add(1, Ordering::SeqCst))
        }

        async fn health_check(&self, _session: &usize) -> bool {
            self.healthy
        }
    }

    #[tokio::test]
    async fn reuses_healthy_sessions() {
        let pool = SessionPool::new(
            CountingFactory { created: AtomicUsize::new(0), healthy: true },
            PoolConfig { base_size: 1, max_overflow: 0, acquire_deadline: Duration::from_millis(100) },
        );
        let guard = pool.acquire().await.unwrap();
        let first_session = *guard.get();
        drop(guard);
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(pool.idle_count(), 1);

        let guard2 = pool.acquire().await.unwrap();
        assert_eq!(*guard2.get(), first_session);
    }

    #[tokio::test]
    async fn discards_unhealthy_sessions() {
        let pool = SessionPool::new(
            CountingFactory { created: AtomicUsize::new(0), healthy: false },
            PoolConfig { base_size: 1, max_overflow: 0, acquire_deadline: Duration::from_millis(100) },
        );
        let guard = pool.acquire().await.unwrap();
        drop(guard);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn exhaustion_times_out() {
        let pool = SessionPool::new(
            CountingFactory { created: AtomicUsize::new(0), healthy: true },
            PoolConfig { base_size: 1, max_overflow: 0, acquire_deadline: Duration::from_millis(20) },
        );
        let _guard = pool.acquire().await.unwrap();
        let err = pool.acquire().await.unwrap_err();
        assert!(matches!(err, crate::ResilienceError::PoolExhausted));
    }
}
