//! Tests for the per-worker ledger

use prometheus_resource_mapper::core::{ResourceSpec, Utilization, WorkerResources};

#[test]
fn test_new_worker_is_empty() {
    let worker = WorkerResources::new("w1", ResourceSpec::new(8.0, 32.0).with_gpus(2, 48.0));
    assert_eq!(worker.worker_id, "w1");
    assert_eq!(worker.allocated, ResourceSpec::zero());
    assert_eq!(worker.reserved, ResourceSpec::zero());
    assert_eq!(worker.available(), worker.total);
    assert!(worker.gpu_type.is_none());
    assert!(worker.registered_at_ms > 0);
}

#[test]
fn test_available_subtracts_allocated_and_reserved() {
    let mut worker = WorkerResources::new("w1", ResourceSpec::new(8.0, 32.0).with_gpus(2, 48.0));
    worker.allocated = ResourceSpec::new(2.0, 8.0).with_gpus(1, 24.0);
    worker.reserved = ResourceSpec::new(1.0, 4.0);

    let available = worker.available();
    assert_eq!(available.cpu_cores, 5.0);
    assert_eq!(available.memory_gb, 20.0);
    assert_eq!(available.gpu_count, 1);
    assert_eq!(available.gpu_memory_gb, 24.0);

    assert!(worker.can_allocate(&ResourceSpec::new(5.0, 20.0).with_gpus(1, 24.0)));
    assert!(!worker.can_allocate(&ResourceSpec::new(5.5, 1.0)));
    assert!(!worker.can_allocate(&ResourceSpec::new(1.0, 1.0).with_gpus(2, 1.0)));
}

#[test]
fn test_utilization() {
    let mut worker = WorkerResources::new("w1", ResourceSpec::new(4.0, 8.0));
    worker.allocated = ResourceSpec::new(1.0, 2.0);
    let util = worker.utilization();
    assert_eq!(util.cpu_percent, Some(25.0));
    assert_eq!(util.memory_percent, Some(25.0));
    assert_eq!(util.gpu_percent, None);
    assert_eq!(util.gpu_memory_percent, None);
}

#[test]
fn test_utilization_with_gpus() {
    let total = ResourceSpec::new(4.0, 8.0).with_gpus(4, 80.0);
    let allocated = ResourceSpec::new(0.0, 0.0).with_gpus(1, 20.0);
    let util = Utilization::from_ledger(&total, &allocated);
    assert_eq!(util.cpu_percent, Some(0.0));
    assert_eq!(util.gpu_percent, Some(25.0));
    assert_eq!(util.gpu_memory_percent, Some(25.0));

    let empty = Utilization::from_ledger(&ResourceSpec::zero(), &ResourceSpec::zero());
    assert_eq!(empty, Utilization::default());
}

#[test]
fn test_compute_capability_support() {
    let worker = WorkerResources::new(
        "a100",
        ResourceSpec::new(16.0, 64.0)
            .with_gpus(1, 40.0)
            .with_compute_capability("8.0"),
    )
    .with_gpu_type("A100");
    assert_eq!(worker.gpu_type.as_deref(), Some("A100"));
    assert!(worker.supports_compute_capability("7.5"));
    assert!(worker.supports_compute_capability("8.0"));
    assert!(worker.supports_compute_capability("8"));
    assert!(!worker.supports_compute_capability("8.6"));
    assert!(!worker.supports_compute_capability("9.0"));
}

#[test]
fn test_compute_capability_edge_cases() {
    let no_gpu = WorkerResources::new("cpu", ResourceSpec::new(4.0, 8.0));
    assert!(!no_gpu.supports_compute_capability("7.0"));

    let tagged = WorkerResources::new(
        "custom",
        ResourceSpec::new(4.0, 8.0)
            .with_gpus(1, 16.0)
            .with_compute_capability("sm_86"),
    );
    assert!(tagged.supports_compute_capability("sm_86"));
    assert!(!tagged.supports_compute_capability("sm_90"));
}
