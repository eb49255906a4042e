//! Resolves a [`Task`] to a concrete `(server_id, tool_name)` pair and
//! invokes it through the full resilience stack (spec §4.14).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use aperture_core::{CapabilityName, ErrorKind, ServerId, Timestamp};
use aperture_events::{BreakerState, EventBus};
use aperture_mcp::McpClient;
use aperture_resilience::{
    BreakerConfig, CircuitBreaker, DeadLetterQueue, DlqEntry, PoolConfig, RateLimitConfig,
    RateLimitDecision, RateLimiter, ResilienceError, RetryExhausted, RetryPolicy, SessionFactory,
    SessionPool,
};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::{RegistryError, RouterError, RouterResult};
use crate::registry::Registry;
use crate::session::ServerSessionProvider;
use crate::types::{RouteOutcome, Task};

/// Resilience tunables applied uniformly to every routed server (spec
/// §4.5-§4.9).
#[derive(Clone)]
pub struct RouterConfig {
    /// Transport session pool sizing, per server.
    pub pool: PoolConfig,
    /// Circuit breaker thresholds, per server.
    pub breaker: BreakerConfig,
    /// Retry attempts and backoff.
    pub retry: RetryPolicy,
    /// Sliding-window rate limit, applied per `(server_id, tool_name)`.
    pub rate_limit: RateLimitConfig,
    /// Deadline for one `tools/call` attempt.
    pub call_timeout: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            breaker: BreakerConfig::default(),
            retry: RetryPolicy::default(),
            rate_limit: RateLimitConfig::default(),
            call_timeout: Duration::from_secs(10),
        }
    }
}

struct ServerSessionFactory {
    server_id: ServerId,
    provider: Arc<dyn ServerSessionProvider>,
}

#[async_trait]
impl SessionFactory for ServerSessionFactory {
    type Session = McpClient;

    async fn create(&self) -> Result<McpClient, ResilienceError> {
        self.provider.session(self.server_id).await.ok_or(ResilienceError::PoolExhausted)
    }

    async fn health_check(&self, session: &McpClient) -> bool {
        session.state().accepts_calls()
    }
}

/// Routes [`Task`]s to a live server, composing the session pool, circuit
/// breaker, retry policy, rate limiter, and (opt-in) dead-letter queue
/// (spec data flow: `Router -> Pool -> Circuit breaker -> Retry -> MCP
/// Client -> Transport`).
pub struct Router {
    registry: Arc<Registry>,
    provider: Arc<dyn ServerSessionProvider>,
    events: EventBus,
    config: RouterConfig,
    dlq: Option<Arc<DeadLetterQueue>>,
    pools: DashMap<ServerId, Arc<SessionPool<ServerSessionFactory>>>,
    breakers: DashMap<ServerId, Arc<CircuitBreaker>>,
    rate_limiter: RateLimiter,
    cursors: DashMap<CapabilityName, AtomicUsize>,
    latencies: DashMap<ServerId, Mutex<f64>>,
}

impl Router {
    /// Build a router over `registry`, resolving live sessions through
    /// `provider`.
    #[must_use]
    pub fn new(
        registry: Arc<Registry>,
        provider: Arc<dyn ServerSessionProvider>,
        events: EventBus,
        config: RouterConfig,
        dlq: Option<Arc<DeadLetterQueue>>,
    ) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit);
        Self {
            registry,
            provider,
            events,
            config,
            dlq,
            pools: DashMap::new(),
            breakers: DashMap::new(),
            rate_limiter,
            cursors: DashMap::new(),
            latencies: DashMap::new(),
        }
    }

    /// Resolve and invoke `task`.
    ///
    /// # Errors
    /// Returns [`RouterError::Registry`] if the capability has no bound
    /// server, [`RouterError::AllBreakersOpen`] if every bound server is
    /// circuit-open, [`RouterError::Resilience`] if the pool or rate
    /// limiter rejects the call, or [`RouterError::Exhausted`] if the
    /// retried call ultimately failed.
    pub async fn route(&self, task: Task) -> RouterResult<RouteOutcome> {
        let bound = self.registry.servers_for(&task.capability);
        if bound.is_empty() {
            return Err(RegistryError::CapabilityUnavailable(task.capability.clone()).into());
        }

        let eligible: Vec<ServerId> = bound
            .into_iter()
            .filter(|id| matches!(self.breaker_for(*id).state(), BreakerState::Closed | BreakerState::HalfOpen))
            .collect();
        if eligible.is_empty() {
            return Err(RouterError::AllBreakersOpen(task.capability.clone()));
        }

        let server_id = self.select(&task.capability, eligible);
        self.invoke(server_id, task).await
    }

    fn select(&self, capability: &CapabilityName, mut candidates: Vec<ServerId>) -> ServerId {
        candidates.sort_by(|a, b| {
            self.latency_ms(*a)
                .partial_cmp(&self.latency_ms(*b))
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.cmp(b))
        });
        let cursor = self.cursors.entry(capability.clone()).or_insert_with(|| AtomicUsize::new(0));
        let index = cursor.fetch_add(1, Ordering::Relaxed) % candidates.len();
        candidates[index]
    }

    async fn invoke(&self, server_id: ServerId, task: Task) -> RouterResult<RouteOutcome> {
        let breaker = self.breaker_for(server_id);
        breaker.try_acquire().map_err(RouterError::Resilience)?;

        if let RateLimitDecision::Denied { retry_after } =
            self.rate_limiter.check(server_id, &task.tool_name)
        {
            return Err(ResilienceError::RateLimited {
                retry_after_ms: u64::try_from(retry_after.as_millis()).unwrap_or(u64::MAX),
            }
            .into());
        }

        let pool = self.pool_for(server_id);
        let guard = pool.acquire().await.map_err(RouterError::Resilience)?;
        let client = guard.get().clone();
        drop(guard);

        let timeout = self.config.call_timeout;
        let tool_name = task.tool_name.clone();
        let arguments = task.arguments.clone();
        let started = Instant::now();

        let outcome = self
            .config
            .retry
            .execute(
                || {
                    let client = client.clone();
                    let tool_name = tool_name.clone();
                    let arguments = arguments.clone();
                    async move { client.tools_call(&tool_name, arguments, timeout).await }
                },
                |err| err.kind().recoverability() != aperture_core::Recoverability::Terminal,
            )
            .await;

        match outcome {
            Ok(value) => {
                breaker.record_success();
                self.record_latency(server_id, started.elapsed());
                Ok(RouteOutcome { server_id, result: value })
            }
            Err(RetryExhausted { last_error, .. }) => {
                if last_error.kind().counts_toward_breaker() {
                    breaker.record_failure();
                }
                if task.allow_dlq {
                    self.offer_to_dlq(server_id, &task, last_error.kind(), &last_error.to_string()).await;
                }
                Err(RouterError::Exhausted(last_error))
            }
        }
    }

    async fn offer_to_dlq(&self, server_id: ServerId, task: &Task, error_kind: ErrorKind, message: &str) {
        let Some(dlq) = &self.dlq else { return };
        let entry = DlqEntry {
            id: aperture_core::DlqEntryId::new(),
            server_id,
            capability: task.capability.clone(),
            method: task.tool_name.clone(),
            params: task.arguments.clone(),
            error_kind,
            message: message.to_string(),
            enqueued_at: Timestamp::now(),
        };
        if let Err(err) = dlq.add(entry).await {
            tracing::warn!(%server_id, error = %err, "failed to persist dead-letter entry");
        }
    }

    fn breaker_for(&self, server_id: ServerId) -> Arc<CircuitBreaker> {
        Arc::clone(&*self.breakers.entry(server_id).or_insert_with(|| {
            Arc::new(CircuitBreaker::new(server_id, self.config.breaker).with_events(self.events.clone()))
        }))
    }

    fn pool_for(&self, server_id: ServerId) -> Arc<SessionPool<ServerSessionFactory>> {
        Arc::clone(&*self.pools.entry(server_id).or_insert_with(|| {
            let factory = ServerSessionFactory { server_id, provider: Arc::clone(&self.provider) };
            SessionPool::new(factory, self.config.pool)
        }))
    }

    fn latency_ms(&self, server_id: ServerId) -> f64 {
        self.latencies.get(&server_id).map(|m| *m.lock()).unwrap_or(0.0)
    }

    fn record_latency(&self, server_id: ServerId, elapsed: Duration) {
        const ALPHA: f64 = 0.2;
        let sample = elapsed.as_secs_f64() * 1000.0;
        let mut entry = self.latencies.entry(server_id).or_insert_with(|| Mutex::new(sample));
        let mut value = entry.lock();
        *value = ALPHA * sample + (1.0 - ALPHA) * *value;
    }
}

#[cfg(test)]
mod tests {
    use aperture_test::test_capability;
    use serde_json::json;

    use super::*;

    struct NoSessionProvider;

    #[async_trait]
    impl ServerSessionProvider for NoSessionProvider {
        async fn session(&self, _server_id: ServerId) -> Option<McpClient> {
            None
        }
    }

    fn router() -> Router {
        Router::new(
            Arc::new(Registry::new(EventBus::new())),
            Arc::new(NoSessionProvider),
            EventBus::new(),
            RouterConfig::default(),
            None,
        )
    }

    #[tokio::test]
    async fn unbound_capability_reports_unavailable() {
        let router = router();
        let task = Task::new(test_capability("filesystem"), "read_file", json!({}));
        let err = router.route(task).await.unwrap_err();
        assert!(matches!(err, RouterError::Registry(RegistryError::CapabilityUnavailable(_))));
        assert_eq!(err.kind(), ErrorKind::CapabilityUnavailable);
    }

    #[tokio::test]
    async fn bound_capability_with_unreachable_session_surfaces_resilience_error() {
        let registry = Arc::new(Registry::new(EventBus::new()));
        let server = ServerId::new();
        let capability = test_capability("filesystem");
        registry.register(
            server,
            vec![capability.clone()],
            vec![aperture_mcp::ToolDescriptor {
                server_id: server,
                tool_name: "read_file".to_string(),
                input_schema: json!({"type": "object"}),
                output_hint: None,
            }],
        );
        let router = Router::new(
            registry,
            Arc::new(NoSessionProvider),
            EventBus::new(),
            RouterConfig::default(),
            None,
        );
        let task = Task::new(capability, "read_file", json!({"path": "/tmp/x"}));
        let err = router.route(task).await.unwrap_err();
        assert!(matches!(err, RouterError::Resilience(ResilienceError::PoolExhausted)));
    }
}
