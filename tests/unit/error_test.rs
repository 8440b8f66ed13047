//! Tests for error types

use prometheus_resource_mapper::core::{ErrorKind, MapperError, ResourceSpec};
use uuid::Uuid;

#[test]
fn test_insufficient_resources_error() {
    let err = MapperError::InsufficientResources {
        worker_id: "w1".to_string(),
        shortfall: ResourceSpec::new(1.0, 2.0),
    };
    assert_eq!(
        format!("{}", err),
        "insufficient resources on worker w1: short by cpu=1.0 mem=2.0GB gpu=0 gpu_mem=0.0GB disk=0.0GB"
    );
    assert_eq!(err.kind(), ErrorKind::CapacityShortfall);
}

#[test]
fn test_resource_conflict_error() {
    let err = MapperError::ResourceConflict("worker w1 is already registered".to_string());
    assert_eq!(
        format!("{}", err),
        "resource conflict: worker w1 is already registered"
    );
    assert_eq!(err.kind(), ErrorKind::Conflict);
}

#[test]
fn test_not_found_errors() {
    let id = Uuid::nil();
    assert_eq!(
        MapperError::WorkerNotFound("w9".into()).kind(),
        ErrorKind::NotFound
    );
    assert_eq!(MapperError::AllocationNotFound(id).kind(), ErrorKind::NotFound);
    assert_eq!(MapperError::ReservationNotFound(id).kind(), ErrorKind::NotFound);
    assert_eq!(
        format!("{}", MapperError::WorkerNotFound("w9".into())),
        "worker not found: w9"
    );
}

#[test]
fn test_reservation_mismatch_is_conflict() {
    let err = MapperError::ReservationMismatch {
        reservation_id: Uuid::nil(),
        reason: "held on worker w2, not w1".to_string(),
    };
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(format!("{}", err).contains("held on worker w2"));
}

#[test]
fn test_internal_and_input_errors() {
    let violation = MapperError::InvariantViolation {
        worker_id: "w1".to_string(),
        detail: "cpu_cores".to_string(),
    };
    assert_eq!(violation.kind(), ErrorKind::Internal);
    assert_eq!(MapperError::Runtime("no runtime".into()).kind(), ErrorKind::Internal);
    assert_eq!(MapperError::InvalidSpec("neg".into()).kind(), ErrorKind::InvalidInput);
    assert_eq!(MapperError::InvalidConfig("bad".into()).kind(), ErrorKind::InvalidInput);
}
