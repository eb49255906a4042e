//! Router + Registry + dead-letter queue composed together (spec §8
//! invariants 3 and 6). A pool-exhaustion failure happens before a session
//! is ever acquired, so it is not DLQ-eligible even when the task opts in;
//! only a terminally-failed invocation is.

use std::sync::Arc;

use aperture_core::ServerId;
use aperture_events::EventBus;
use aperture_mcp::{McpClient, ToolDescriptor};
use aperture_registry::{Registry, Router, RouterConfig, RouterError, ServerSessionProvider, Task};
use aperture_resilience::{DeadLetterQueue, ResilienceError};
use aperture_storage::MemoryKvStore;
use aperture_test::test_capability;
use async_trait::async_trait;
use serde_json::json;

struct NoSessionProvider;

#[async_trait]
impl ServerSessionProvider for NoSessionProvider {
    async fn session(&self, _server_id: ServerId) -> Option<McpClient> {
        None
    }
}

#[tokio::test]
async fn pool_exhaustion_is_not_dlq_eligible_even_when_the_task_opts_in() {
    let store: Arc<dyn aperture_storage::KvStore> = Arc::new(MemoryKvStore::new());
    let dlq = Arc::new(DeadLetterQueue::open(Arc::clone(&store), 10).await.unwrap());

    let registry = Arc::new(Registry::new(EventBus::new()));
    let server = ServerId::new();
    let capability = test_capability("filesystem");
    registry.register(
        server,
        vec![capability.clone()],
        vec![ToolDescriptor {
            server_id: server,
            tool_name: "read_file".to_string(),
            input_schema: json!({"type": "object"}),
            output_hint: None,
        }],
    );

    let router = Router::new(
        Arc::clone(&registry),
        Arc::new(NoSessionProvider),
        EventBus::new(),
        RouterConfig::default(),
        Some(Arc::clone(&dlq)),
    );

    // `NoSessionProvider` never hands back a session, so the pool fails
    // before any invocation is attempted: this is not a retry-exhausted
    // outcome and must never reach the dead-letter queue.
    let task = Task::new(capability, "read_file", json!({"path": "/tmp/x"})).with_dlq();
    let err = router.route(task).await.unwrap_err();
    assert!(matches!(err, RouterError::Resilience(ResilienceError::PoolExhausted)));

    assert!(dlq.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn dlq_evicts_oldest_entry_once_at_capacity() {
    use aperture_core::{DlqEntryId, ErrorKind, Timestamp};
    use aperture_resilience::DlqEntry;

    let store: Arc<dyn aperture_storage::KvStore> = Arc::new(MemoryKvStore::new());
    let dlq = DeadLetterQueue::open(store, 2).await.unwrap();
    let server = ServerId::new();
    let capability = test_capability("filesystem");

    let mut ids = Vec::new();
    for i in 0..3 {
        let id = DlqEntryId::new();
        ids.push(id);
        dlq.add(DlqEntry {
            id,
            server_id: server,
            capability: capability.clone(),
            method: "read_file".to_string(),
            params: json!({ "i": i }),
            error_kind: ErrorKind::TransportError,
            message: format!("attempt {i} failed"),
            enqueued_at: Timestamp::now(),
        })
        .await
        .unwrap();
    }

    let stats = dlq.stats();
    assert_eq!(stats.len, 2);
    assert_eq!(stats.capacity, 2);

    let remaining: Vec<DlqEntryId> = dlq.list().await.unwrap().into_iter().map(|e| e.id).collect();
    assert_eq!(remaining, vec![ids[1], ids[2]]);
}
