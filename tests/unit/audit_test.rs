//! Tests for audit sink

use std::sync::Arc;

use parking_lot::Mutex;
use prometheus_resource_mapper::core::{
    build_audit_event, AuditAction, AuditEvent, AuditSink, InMemoryAuditSink, ResourceMapper,
    ResourceSpec,
};

/// Sink that shares its buffer with the test after being boxed into the mapper.
struct SharedSink(Arc<Mutex<Vec<AuditEvent>>>);

impl AuditSink for SharedSink {
    fn record(&mut self, event: AuditEvent) {
        self.0.lock().push(event);
    }
}

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    let event = build_audit_event(
        AuditAction::Allocate,
        "w1",
        Some("alloc-1".to_string()),
        Some("task1".to_string()),
        Some("cpu=1.0".to_string()),
    );

    sink.record(event);
    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AuditAction::Allocate);
    assert_eq!(events[0].worker_id, "w1");
    assert_eq!(events[0].task_id.as_deref(), Some("task1"));
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(build_audit_event(AuditAction::Register, "w1", None, None, None));
    sink.record(build_audit_event(AuditAction::Register, "w2", None, None, None));
    sink.record(build_audit_event(AuditAction::Register, "w3", None, None, None));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].worker_id, "w2"); // First one popped
    assert_eq!(events[1].worker_id, "w3");
}

#[test]
fn test_build_audit_event() {
    let event = build_audit_event(
        AuditAction::Expire,
        "w1",
        Some("res-1".to_string()),
        None,
        Some("cpu=1.0".to_string()),
    );

    assert_eq!(event.action, AuditAction::Expire);
    assert_eq!(event.record_id.as_deref(), Some("res-1"));
    assert_eq!(event.payload.as_deref(), Some("cpu=1.0"));
    assert!(!event.event_id.is_empty());
    assert!(event.created_at_ms > 0);
}

#[test]
fn test_mapper_records_lifecycle() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let mapper = ResourceMapper::default().with_audit(Box::new(SharedSink(Arc::clone(&events))));

    mapper
        .register_worker("w1", ResourceSpec::new(4.0, 8.0))
        .unwrap();
    let allocation = mapper
        .allocate("w1", &ResourceSpec::new(1.0, 2.0), "t1", None, None)
        .unwrap();
    mapper.release(allocation.id).unwrap();
    let reservation = mapper
        .reserve_resources("w1", &ResourceSpec::new(1.0, 1.0), None)
        .unwrap();
    mapper.cancel_reservation(reservation.id).unwrap();

    let actions: Vec<AuditAction> = events.lock().iter().map(|e| e.action).collect();
    assert_eq!(
        actions,
        vec![
            AuditAction::Register,
            AuditAction::Allocate,
            AuditAction::Release,
            AuditAction::Reserve,
            AuditAction::Cancel,
        ]
    );
    let allocate = events.lock()[1].clone();
    assert_eq!(allocate.record_id, Some(allocation.id.to_string()));
    assert_eq!(allocate.task_id.as_deref(), Some("t1"));

    let cancel = events.lock()[4].clone();
    assert_eq!(cancel.record_id, Some(reservation.id.to_string()));
    assert_eq!(cancel.worker_id, "w1");
    assert!(cancel.task_id.is_none());
}
