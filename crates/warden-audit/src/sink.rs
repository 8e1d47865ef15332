//! Audit sinks.
//!
//! Recording is infallible from the caller's point of view: a sink that
//! cannot persist an event logs the failure and moves on. The request path
//! never waits on or fails because of audit.

use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tracing::{error, info, warn};

use crate::event::{AuditEvent, Severity};

/// Destination for audit events.
#[async_trait]
pub trait AuditSink: Send + Sync + std::fmt::Debug {
    /// Record one event.
    async fn record(&self, event: AuditEvent);
}

/// Keeps events in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: RwLock<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every recorded event.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of recorded events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events whose kind has the given [`name`](crate::AuditKind::name).
    #[must_use]
    pub fn events_named(&self, name: &str) -> Vec<AuditEvent> {
        self.events
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.kind.name() == name)
            .cloned()
            .collect()
    }

    /// Drop all recorded events.
    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record(&self, event: AuditEvent) {
        self.events
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

/// Emits events as structured `tracing` records on the `warden::audit`
/// target, at a level matching their severity.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        let request_id = event.request.as_ref().map(|r| r.request_id.to_string());
        let endpoint = event.request.as_ref().and_then(|r| r.endpoint.clone());
        let source_ip = event
            .request
            .as_ref()
            .and_then(|r| r.source_ip)
            .map(|ip| ip.to_string());

        match event.severity() {
            Severity::Info => info!(
                target: "warden::audit",
                event_id = %event.id,
                kind = event.kind.name(),
                request_id = request_id.as_deref(),
                endpoint = endpoint.as_deref(),
                source_ip = source_ip.as_deref(),
                "{}", event.description()
            ),
            Severity::Warning => warn!(
                target: "warden::audit",
                event_id = %event.id,
                kind = event.kind.name(),
                request_id = request_id.as_deref(),
                endpoint = endpoint.as_deref(),
                source_ip = source_ip.as_deref(),
                "{}", event.description()
            ),
            Severity::Alert => error!(
                target: "warden::audit",
                event_id = %event.id,
                kind = event.kind.name(),
                request_id = request_id.as_deref(),
                endpoint = endpoint.as_deref(),
                source_ip = source_ip.as_deref(),
                alert = true,
                "{}", event.description()
            ),
        }
    }
}

/// Forwards every event to each inner sink in order.
#[derive(Debug, Default)]
pub struct FanoutAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl FanoutAuditSink {
    /// Create an empty fan-out.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink.
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of inner sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there are no inner sinks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl AuditSink for FanoutAuditSink {
    async fn record(&self, event: AuditEvent) {
        let Some((last, rest)) = self.sinks.split_last() else {
            return;
        };
        for sink in rest {
            sink.record(event.clone()).await;
        }
        last.record(event).await;
    }
}
