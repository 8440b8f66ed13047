//! Tests for utility functions

use std::collections::HashSet;
use std::time::Duration;

use prometheus_resource_mapper::util::{
    deadline_after, init_tracing, new_record_id, now_ms, AllocationId, DEFAULT_LOG_FILTER,
};

#[test]
fn test_now_ms_advances() {
    let first = now_ms();
    std::thread::sleep(Duration::from_millis(5));
    let second = now_ms();
    assert!(first > 0);
    assert!(second >= first);
}

#[test]
fn test_deadline_after() {
    assert_eq!(deadline_after(1_000, Duration::from_secs(2)), 3_000);
    assert_eq!(deadline_after(1_000, Duration::ZERO), 1_000);
    assert_eq!(deadline_after(u128::MAX, Duration::from_secs(1)), u128::MAX);
}

#[test]
fn test_record_ids_are_unique() {
    let ids: HashSet<AllocationId> = (0..1_000).map(|_| new_record_id()).collect();
    assert_eq!(ids.len(), 1_000);
}

#[test]
fn test_init_tracing_is_idempotent() {
    assert!(DEFAULT_LOG_FILTER.starts_with("prometheus_resource_mapper"));
    init_tracing();
    init_tracing();
    tracing::info!("tracing initialised twice without panicking");
}
