//! Tests for configuration validation

use std::collections::HashMap;

use prometheus_resource_mapper::config::mapper::{
    ENV_RESERVATION_SECS, ENV_STRATEGY, ENV_SWEEP_INTERVAL_SECS,
};
use prometheus_resource_mapper::config::{
    EngineConfig, MapperConfig, QualityConfig, ScalingMultipliers, ScalingOverride,
    ENV_QUALITY_CONFIG,
};
use prometheus_resource_mapper::core::{AllocationStrategy, QualityTier};

fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn test_mapper_config_defaults() {
    let cfg = MapperConfig::default();
    assert_eq!(cfg.default_strategy, AllocationStrategy::FirstFit);
    assert_eq!(cfg.sweep_interval_secs, 60);
    assert_eq!(cfg.default_reservation_secs, 300);
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.default_reservation_ttl().as_secs(), 300);
}

#[test]
fn test_mapper_config_invalid_intervals() {
    let invalid = MapperConfig {
        sweep_interval_secs: 0,
        ..MapperConfig::default()
    };
    assert!(invalid.validate().is_err());

    let invalid = MapperConfig {
        default_reservation_secs: 0,
        ..MapperConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_mapper_config_from_lookup() {
    let cfg = MapperConfig::from_lookup(lookup_from(&[
        (ENV_STRATEGY, "Best-Fit"),
        (ENV_SWEEP_INTERVAL_SECS, "5"),
        (ENV_RESERVATION_SECS, " 30 "),
    ]))
    .unwrap();
    assert_eq!(cfg.default_strategy, AllocationStrategy::BestFit);
    assert_eq!(cfg.sweep_interval_secs, 5);
    assert_eq!(cfg.default_reservation_secs, 30);
}

#[test]
fn test_mapper_config_from_lookup_rejects_bad_values() {
    assert!(MapperConfig::from_lookup(lookup_from(&[(ENV_STRATEGY, "round_robin")])).is_err());
    assert!(MapperConfig::from_lookup(lookup_from(&[(ENV_SWEEP_INTERVAL_SECS, "soon")])).is_err());
    assert!(MapperConfig::from_lookup(lookup_from(&[(ENV_RESERVATION_SECS, "0")])).is_err());
}

#[test]
fn test_quality_config_default_is_valid() {
    let cfg = QualityConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(*cfg.tiers.get(QualityTier::Standard), ScalingMultipliers::STANDARD);
    assert!(cfg.task_overrides.contains_key("image_generation"));
    assert!(cfg.task_overrides.contains_key("video_generation"));
    assert!(cfg.task_overrides.contains_key("audio_generation"));
}

#[test]
fn test_quality_config_resolve_applies_task_overrides() {
    let cfg = QualityConfig::default();
    let generic = cfg.resolve(QualityTier::Ultra, None);
    let image = cfg.resolve(QualityTier::Ultra, Some("image_generation"));
    assert_eq!(generic.gpu_memory, 2.0);
    assert_eq!(image.gpu_memory, 1.8);
    assert_eq!(image.time, 5.0);
    assert_eq!(image.cpu, generic.cpu);

    let audio = cfg.resolve(QualityTier::High, Some("audio_generation"));
    assert_eq!(audio.gpu_memory, 1.5);
    assert_eq!(audio.time, 1.5);

    let unknown = cfg.resolve(QualityTier::High, Some("text_generation"));
    assert_eq!(unknown, *cfg.tiers.get(QualityTier::High));
}

#[test]
fn test_quality_config_rejects_non_baseline_standard() {
    let mut cfg = QualityConfig::default();
    cfg.tiers.standard.cpu = 1.1;
    assert!(cfg.validate().is_err());

    let mut cfg = QualityConfig::default();
    cfg.tiers.standard.priority = 5;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_quality_config_rejects_non_monotonic_tiers() {
    let mut cfg = QualityConfig::default();
    cfg.tiers.high.cpu = 0.4;
    let err = cfg.validate().unwrap_err();
    assert!(err.contains("monotonic"));

    let mut cfg = QualityConfig::default();
    cfg.tiers.ultra.priority = cfg.tiers.high.priority;
    assert!(cfg.validate().is_err());
}

#[test]
fn test_quality_config_rejects_bad_task_overrides() {
    let mut cfg = QualityConfig::default();
    cfg.task_overrides
        .get_mut("image_generation")
        .unwrap()
        .insert(QualityTier::Standard, ScalingOverride::default());
    assert!(cfg.validate().is_err());

    let mut cfg = QualityConfig::default();
    cfg.task_overrides.get_mut("video_generation").unwrap().insert(
        QualityTier::Draft,
        ScalingOverride {
            cpu: Some(-1.0),
            ..ScalingOverride::default()
        },
    );
    assert!(cfg.validate().is_err());

    // Draft above high for this task type
    let mut cfg = QualityConfig::default();
    cfg.task_overrides.get_mut("video_generation").unwrap().insert(
        QualityTier::Draft,
        ScalingOverride {
            gpu_memory: Some(3.0),
            ..ScalingOverride::default()
        },
    );
    assert!(cfg.validate().is_err());
}

#[test]
fn test_quality_config_json_roundtrip() {
    let cfg = QualityConfig::default();
    let raw = serde_json::to_string(&cfg).unwrap();
    let parsed = QualityConfig::from_json_str(&raw).unwrap();
    assert_eq!(parsed, cfg);
    assert!(QualityConfig::from_json_str("{not json").is_err());
}

#[test]
fn test_engine_config_from_json() {
    let raw = r#"{
        "mapper": { "default_strategy": "best_fit", "sweep_interval_secs": 10 },
        "workers": [
            { "worker_id": "cpu-1", "total": { "cpu_cores": 8, "memory_gb": 32 } },
            { "worker_id": "gpu-1", "gpu_type": "A100",
              "total": { "cpu_cores": 16, "memory_gb": 64, "gpu_count": 2, "gpu_memory_gb": 80 } }
        ]
    }"#;
    let cfg = EngineConfig::from_json_str(raw).unwrap();
    assert_eq!(cfg.mapper.default_strategy, AllocationStrategy::BestFit);
    assert_eq!(cfg.mapper.sweep_interval_secs, 10);
    assert_eq!(cfg.mapper.default_reservation_secs, 300);
    assert_eq!(cfg.workers.len(), 2);
    assert_eq!(cfg.workers[1].gpu_type.as_deref(), Some("A100"));
    assert_eq!(cfg.workers[1].total.gpu_count, 2);
}

#[test]
fn test_engine_config_rejects_duplicate_workers() {
    let raw = r#"{ "workers": [
        { "worker_id": "w1", "total": { "cpu_cores": 1 } },
        { "worker_id": "w1", "total": { "cpu_cores": 2 } }
    ] }"#;
    let err = EngineConfig::from_json_str(raw).unwrap_err();
    assert!(err.contains("listed twice"));
}

#[test]
fn test_engine_config_rejects_negative_capacity() {
    let raw = r#"{ "workers": [ { "worker_id": "w1", "total": { "cpu_cores": -4 } } ] }"#;
    assert!(EngineConfig::from_json_str(raw).is_err());
}

#[test]
fn test_engine_config_from_lookup_reads_quality_file() {
    let mut cfg = QualityConfig::default();
    cfg.tiers.ultra.time = 8.0;
    let path = std::env::temp_dir().join(format!(
        "resource-mapper-quality-{}.json",
        uuid::Uuid::new_v4()
    ));
    std::fs::write(&path, serde_json::to_string(&cfg).unwrap()).unwrap();

    let path_str = path.to_string_lossy().to_string();
    let engine = EngineConfig::from_lookup(lookup_from(&[(ENV_QUALITY_CONFIG, path_str.as_str())]));
    std::fs::remove_file(&path).ok();

    let engine = engine.unwrap();
    assert_eq!(engine.quality.tiers.ultra.time, 8.0);
    assert!(engine.workers.is_empty());
}

#[test]
fn test_engine_config_from_lookup_missing_quality_file() {
    let result = EngineConfig::from_lookup(lookup_from(&[(
        ENV_QUALITY_CONFIG,
        "/nonexistent/resource-mapper/quality.json",
    )]));
    assert!(result.is_err());
}
