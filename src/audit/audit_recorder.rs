use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::task::JoinHandle;

use crate::stores::AuditStore;
use crate::types::internal::audit::NewAuditEvent;
use crate::types::internal::context::RequestContext;

/// Best-effort writer for audit events
///
/// Recording never fails from the caller's point of view. A write that
/// cannot be persisted is logged and counted, and the business operation
/// that triggered it carries on.
pub struct AuditRecorder {
    store: Arc<AuditStore>,
    failed_writes: AtomicU64,
}

impl AuditRecorder {
    pub fn new(store: Arc<AuditStore>) -> Self {
        Self {
            store,
            failed_writes: AtomicU64::new(0),
        }
    }

    /// Persist `event` with actor, IP and user agent taken from `ctx`
    ///
    /// # Returns
    /// * `Some(id)` - the event was written
    /// * `None` - the write failed and was logged
    pub async fn record(&self, ctx: &RequestContext, event: NewAuditEvent) -> Option<i64> {
        match self.store.write_event(ctx, &event).await {
            Ok(id) => {
                tracing::debug!(
                    id,
                    action = %event.action,
                    entity_type = %event.entity_type,
                    actor = %ctx.actor_id,
                    source = %ctx.source,
                    request_id = %ctx.request_id,
                    "Audit event recorded"
                );
                Some(id)
            }
            Err(e) => {
                self.failed_writes.fetch_add(1, Ordering::Relaxed);
                tracing::error!(
                    action = %event.action,
                    entity_type = %event.entity_type,
                    entity_id = ?event.entity_id,
                    actor = %ctx.actor_id,
                    source = %ctx.source,
                    request_id = %ctx.request_id,
                    "Dropped audit event: {}",
                    e
                );
                None
            }
        }
    }

    /// Record on a spawned task so the caller never waits on the write
    pub fn record_detached(self: &Arc<Self>, ctx: RequestContext, event: NewAuditEvent) -> JoinHandle<Option<i64>> {
        let recorder = Arc::clone(self);
        tokio::spawn(async move { recorder.record(&ctx, event).await })
    }

    /// Number of events dropped since startup
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for AuditRecorder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditRecorder")
            .field("failed_writes", &self.failed_writes())
            .finish()
    }
}
