//! Audit sink persisting events into a [`KvStore`].

use std::sync::Arc;

use async_trait::async_trait;
use tracing::error;
use warden_storage::{KvStore, ScopedKvStore};

use crate::error::AuditResult;
use crate::event::AuditEvent;
use crate::sink::AuditSink;

/// Namespace audit events are written to.
pub const NS_AUDIT_EVENTS: &str = "audit:events";

/// Persists each event as JSON under [`NS_AUDIT_EVENTS`].
///
/// Keys are `<unix-millis, zero-padded>-<event id>` so a lexical sort of
/// the keys yields chronological order.
#[derive(Debug, Clone)]
pub struct KvAuditSink {
    store: ScopedKvStore,
}

impl KvAuditSink {
    /// Bind the sink to a store.
    ///
    /// # Errors
    ///
    /// Returns an error if the namespace is rejected by the store.
    pub fn new(store: Arc<dyn KvStore>) -> AuditResult<Self> {
        Ok(Self {
            store: ScopedKvStore::new(store, NS_AUDIT_EVENTS)?,
        })
    }

    fn key_for(event: &AuditEvent) -> String {
        let millis = event.timestamp.0.timestamp_millis().max(0);
        format!("{millis:020}-{}", event.id)
    }

    /// Persist one event, reporting failures.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or the store write fails.
    pub async fn append(&self, event: &AuditEvent) -> AuditResult<()> {
        self.store.set_json(&Self::key_for(event), event).await?;
        Ok(())
    }

    /// Every persisted event, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or an entry does not
    /// decode.
    pub async fn events(&self) -> AuditResult<Vec<AuditEvent>> {
        let mut keys = self.store.list_keys().await?;
        keys.sort();

        let mut events = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(event) = self.store.get_json::<AuditEvent>(&key).await? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Number of persisted events.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub async fn count(&self) -> AuditResult<usize> {
        Ok(self.store.list_keys().await?.len())
    }
}

#[async_trait]
impl AuditSink for KvAuditSink {
    async fn record(&self, event: AuditEvent) {
        if let Err(e) = self.append(&event).await {
            error!(
                event_id = %event.id,
                kind = event.kind.name(),
                error = %e,
                "Failed to persist audit event"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::AuditKind;
    use warden_core::{RejectReason, Timestamp};
    use warden_storage::MemoryKvStore;

    fn failure_at(secs: i64, reason: RejectReason) -> AuditEvent {
        AuditEvent::new(
            AuditKind::VerificationFailure { reason },
            Timestamp::from_unix(secs).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_events_come_back_in_time_order() {
        let sink = KvAuditSink::new(Arc::new(MemoryKvStore::new())).unwrap();

        let late = failure_at(2_000, RejectReason::Revoked);
        let early = failure_at(1_000, RejectReason::Expired);
        sink.record(late.clone()).await;
        sink.record(early.clone()).await;

        assert_eq!(sink.count().await.unwrap(), 2);
        assert_eq!(sink.events().await.unwrap(), vec![early, late]);
    }

    #[tokio::test]
    async fn test_events_live_in_audit_namespace() {
        let kv = Arc::new(MemoryKvStore::new());
        let sink = KvAuditSink::new(kv.clone()).unwrap();
        sink.record(failure_at(1, RejectReason::Malformed)).await;

        assert_eq!(kv.list_keys(NS_AUDIT_EVENTS).await.unwrap().len(), 1);
        assert!(kv.list_keys("other").await.unwrap().is_empty());
    }
}
