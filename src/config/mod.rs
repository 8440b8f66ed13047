//! Configuration models for the mapper and quality scaling.

pub mod mapper;
pub mod quality;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::ResourceSpec;

pub use mapper::MapperConfig;
pub use quality::{QualityConfig, ScalingMultipliers, ScalingOverride, TaskTypeOverrides, TierMultipliers};

/// Environment variable naming a JSON file with the quality tables.
pub const ENV_QUALITY_CONFIG: &str = "RESOURCE_MAPPER_QUALITY_CONFIG";

/// A worker known at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Registry key.
    pub worker_id: String,
    /// Full capacity.
    pub total: ResourceSpec,
    /// GPU model, if any.
    #[serde(default)]
    pub gpu_type: Option<String>,
}

/// Root engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Mapper settings.
    #[serde(default)]
    pub mapper: MapperConfig,
    /// Quality scaling tables.
    #[serde(default)]
    pub quality: QualityConfig,
    /// Workers registered when the engine is built.
    #[serde(default)]
    pub workers: Vec<WorkerConfig>,
}

impl EngineConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.mapper
            .validate()
            .map_err(|e| format!("mapper invalid: {e}"))?;
        self.quality
            .validate()
            .map_err(|e| format!("quality invalid: {e}"))?;
        let mut seen = HashSet::new();
        for worker in &self.workers {
            if !seen.insert(worker.worker_id.as_str()) {
                return Err(format!("worker `{}` listed twice", worker.worker_id));
            }
            worker
                .total
                .validate()
                .map_err(|e| format!("worker `{}` invalid: {e}", worker.worker_id))?;
        }
        Ok(())
    }

    /// Parse engine configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from the process environment, reading a `.env` file first if present.
    pub fn from_env() -> Result<Self, String> {
        // .env is optional.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from arbitrary key lookups; see [`MapperConfig::from_lookup`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mapper = MapperConfig::from_lookup(&lookup)?;
        let quality = match lookup(ENV_QUALITY_CONFIG) {
            Some(path) => {
                let raw = std::fs::read_to_string(&path)
                    .map_err(|e| format!("cannot read {ENV_QUALITY_CONFIG} `{path}`: {e}"))?;
                QualityConfig::from_json_str(&raw)?
            }
            None => QualityConfig::default(),
        };
        let cfg = Self {
            mapper,
            quality,
            workers: Vec::new(),
        };
        cfg.validate()?;
        Ok(cfg)
    }
}
