//! Request context for log correlation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use warden_core::RequestMeta;

/// Correlation data attached to every log line of one auth decision.
///
/// When built from a [`RequestMeta`] the `request_id` is shared with the
/// audit event, so logs and audit records can be joined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestContext {
    /// Unique request identifier.
    pub request_id: Uuid,
    /// Correlation ID shared by related requests.
    pub correlation_id: Uuid,
    /// Parent request ID for sub-operations.
    pub parent_id: Option<Uuid>,
    /// When the context was created.
    pub started_at: DateTime<Utc>,
    /// Component that created this context.
    pub source: String,
    /// Operation being performed (`verify`, `authorize`, ...).
    pub operation: Option<String>,
    /// Endpoint being served, if the transport supplied one.
    pub endpoint: Option<String>,
    /// Free-form extra fields.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl RequestContext {
    /// Create a context with a fresh request ID.
    #[must_use]
    pub fn new(source: impl Into<String>) -> Self {
        let id = Uuid::new_v4();
        Self {
            request_id: id,
            correlation_id: id,
            parent_id: None,
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
            endpoint: None,
            metadata: HashMap::new(),
        }
    }

    /// Create a context that reuses the transport's request ID.
    #[must_use]
    pub fn from_meta(source: impl Into<String>, meta: &RequestMeta) -> Self {
        let mut ctx = Self::new(source);
        ctx.request_id = meta.request_id;
        ctx.correlation_id = meta.request_id;
        ctx.endpoint.clone_from(&meta.endpoint);
        if let Some(ip) = meta.source_ip {
            ctx.metadata.insert("source_ip".to_string(), ip.to_string());
        }
        ctx
    }

    /// Derive a child context that keeps the correlation ID.
    #[must_use]
    pub fn child(&self, source: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            correlation_id: self.correlation_id,
            parent_id: Some(self.request_id),
            started_at: Utc::now(),
            source: source.into(),
            operation: None,
            endpoint: self.endpoint.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Set the operation name.
    #[must_use]
    pub fn with_operation(mut self, operation: impl Into<String>) -> Self {
        self.operation = Some(operation.into());
        self
    }

    /// Add a metadata field.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Milliseconds since the context was created.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// A span carrying the correlation fields.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "auth_request",
            request_id = %self.request_id,
            correlation_id = %self.correlation_id,
            source = %self.source,
            operation = self.operation.as_deref(),
            endpoint = self.endpoint.as_deref(),
        )
    }

    /// Whether this is a sub-operation.
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.parent_id.is_some()
    }

    /// First eight characters of the request ID.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.request_id.simple().to_string().chars().take(8).collect()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new("unknown")
    }
}

/// Enters the context span and logs start and completion.
///
/// Holds an entered span, so only use it around synchronous work.
pub struct RequestGuard {
    context: RequestContext,
    _span: tracing::span::EnteredSpan,
}

impl RequestGuard {
    /// Enter the span of `context`.
    #[must_use]
    pub fn new(context: RequestContext) -> Self {
        let span = context.span().entered();
        tracing::debug!("request started");
        Self {
            context,
            _span: span,
        }
    }

    /// The guarded context.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.context
    }
}

impl Drop for RequestGuard {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.context.elapsed_ms(), "request completed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_context_self_correlated() {
        let ctx = RequestContext::new("verifier");
        assert_eq!(ctx.request_id, ctx.correlation_id);
        assert!(!ctx.has_parent());
    }

    #[test]
    fn test_from_meta_reuses_request_id() {
        let meta = RequestMeta::new()
            .with_endpoint("GET /children/42")
            .with_source_ip("192.0.2.1".parse().unwrap());
        let ctx = RequestContext::from_meta("guard", &meta).with_operation("authorize");

        assert_eq!(ctx.request_id, meta.request_id);
        assert_eq!(ctx.endpoint.as_deref(), Some("GET /children/42"));
        assert_eq!(
            ctx.metadata.get("source_ip").map(String::as_str),
            Some("192.0.2.1")
        );
    }

    #[test]
    fn test_child_context() {
        let parent = RequestContext::new("verifier").with_metadata("tier", "cache");
        let child = parent.child("checker");

        assert_ne!(child.request_id, parent.request_id);
        assert_eq!(child.correlation_id, parent.correlation_id);
        assert_eq!(child.parent_id, Some(parent.request_id));
        assert_eq!(child.metadata.get("tier").map(String::as_str), Some("cache"));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(RequestContext::new("x").short_id().len(), 8);
    }

    #[test]
    fn test_guard_exposes_context() {
        let guard = RequestGuard::new(RequestContext::new("issuer").with_operation("issue"));
        assert_eq!(guard.context().operation.as_deref(), Some("issue"));
        assert!(guard.context().elapsed_ms() >= 0);
    }
}
