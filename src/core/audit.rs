//! Audit trail for ledger lifecycle events.
//!
//! Every mutation of the mapper can be mirrored to an [`AuditSink`],
//! including reservations that are cancelled or swept.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;
use crate::util::serde::new_record_id;

/// Ledger mutation recorded by the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Worker joined the registry.
    Register,
    /// Worker left the registry.
    Unregister,
    /// Resources granted to a task.
    Allocate,
    /// Allocation returned.
    Release,
    /// Resources held for later.
    Reserve,
    /// Reservation dropped by its holder before expiry.
    Cancel,
    /// Reservation lapsed and was swept.
    Expire,
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// What happened.
    pub action: AuditAction,
    /// Worker whose ledger changed.
    pub worker_id: String,
    /// Allocation or reservation id, when the event concerns one.
    pub record_id: Option<String>,
    /// Task the allocation belongs to.
    pub task_id: Option<String>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Resource quantities involved, rendered for humans.
    pub payload: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// Bounded in-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}

/// Helper to build an audit event stamped with the current time.
pub fn build_audit_event(
    action: AuditAction,
    worker_id: impl Into<String>,
    record_id: Option<String>,
    task_id: Option<String>,
    payload: Option<String>,
) -> AuditEvent {
    AuditEvent {
        event_id: new_record_id().to_string(),
        action,
        worker_id: worker_id.into(),
        record_id,
        task_id,
        created_at_ms: now_ms(),
        payload,
    }
}
