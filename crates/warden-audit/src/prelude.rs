//! Convenient re-exports for audit producers.
//!
//! ```rust
//! use warden_audit::prelude::*;
//! ```

pub use crate::{
    AuditError, AuditEvent, AuditKind, AuditResult, AuditSink, FanoutAuditSink, KvAuditSink,
    MemoryAuditSink, Severity, TracingAuditSink,
};
