//! Warden Audit - Typed audit events and the sinks that receive them.
//!
//! This crate provides:
//! - [`AuditEvent`] / [`AuditKind`] with a [`Severity`] per kind
//! - The [`AuditSink`] trait, infallible from the caller's side
//! - Memory, `tracing`, key-value and fan-out sinks
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_audit::prelude::*;
//! use warden_core::{RejectReason, Timestamp};
//!
//! # async fn example() {
//! let sink: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
//! sink.record(AuditEvent::new(
//!     AuditKind::VerificationFailure { reason: RejectReason::Expired },
//!     Timestamp::now(),
//! ))
//! .await;
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod event;
mod kv;
mod sink;

pub use error::{AuditError, AuditResult};
pub use event::{AuditEvent, AuditEventId, AuditKind, Severity};
pub use kv::{KvAuditSink, NS_AUDIT_EVENTS};
pub use sink::{AuditSink, FanoutAuditSink, MemoryAuditSink, TracingAuditSink};
