//! Request correlation context.

use tracing::Span;
use tracing::span::EnteredSpan;
use uuid::Uuid;

/// Correlates a chain of operations (a router call, an acquisition job) across
/// log lines with a stable id, independent of whichever component id (job,
/// server, request) is also in scope.
#[derive(Debug, Clone)]
pub struct RequestContext {
    correlation_id: Uuid,
    component: String,
    operation: Option<String>,
}

impl RequestContext {
    /// Start a context for `component` (e.g. `"router"`, `"orchestrator"`).
    #[must_use]
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            correlation_id: Uuid::new_v4(),
            component: component.into(),
            operation: None,
        }
    }

    /// Attach an operation name, e.g. `"tools/call"`.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// The correlation id threaded through every span this context creates.
    #[must_use]
    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    /// Build a `tracing` span carrying this context's fields.
    #[must_use]
    pub fn span(&self) -> Span {
        tracing::info_span!(
            "request",
            correlation_id = %self.correlation_id,
            component = %self.component,
            operation = self.operation.as_deref().unwrap_or("-"),
        )
    }

    /// Enter the span for the remainder of the current scope.
    #[must_use]
    pub fn enter(&self) -> RequestGuard {
        RequestGuard {
            _entered: self.span().entered(),
        }
    }
}

/// RAII guard keeping a [`RequestContext`]'s span entered.
#[derive(Debug)]
pub struct RequestGuard {
    _entered: EnteredSpan,
}
