//! Builds the mapper and scaler pair from an [`EngineConfig`].

use anyhow::Context;

use crate::config::EngineConfig;
use crate::core::{AppResult, MapperError, QualityResourceScaler, ResourceMapper};

/// The engine's two services, constructed once at process start and shared
/// with request handlers.
pub struct Engine {
    /// Capacity registry and allocation engine.
    pub mapper: ResourceMapper,
    /// Quality-tier requirement scaling.
    pub scaler: QualityResourceScaler,
}

/// Validate `cfg`, then build the scaler and a mapper with the configured
/// workers registered. The sweeper is not started.
pub fn build_engine(cfg: &EngineConfig) -> Result<Engine, MapperError> {
    cfg.validate()
        .map_err(|e| MapperError::InvalidConfig(format!("config invalid: {e}")))?;

    let scaler = QualityResourceScaler::new(cfg.quality.clone())?;
    let mapper = ResourceMapper::new(cfg.mapper.clone());
    for worker in &cfg.workers {
        match &worker.gpu_type {
            Some(gpu_type) => mapper.register_worker_with_gpu_type(
                worker.worker_id.clone(),
                worker.total.clone(),
                gpu_type.clone(),
            )?,
            None => mapper.register_worker(worker.worker_id.clone(), worker.total.clone())?,
        }
    }
    tracing::info!(
        workers = cfg.workers.len(),
        strategy = ?cfg.mapper.default_strategy,
        "resource engine built"
    );
    Ok(Engine { mapper, scaler })
}

/// Parse a JSON engine configuration and build from it.
pub fn build_engine_from_json(input: &str) -> AppResult<Engine> {
    let cfg = EngineConfig::from_json_str(input)
        .map_err(anyhow::Error::msg)
        .context("loading engine configuration from JSON")?;
    Ok(build_engine(&cfg)?)
}

/// Load configuration from the environment (and `.env`) and build from it.
pub fn build_engine_from_env() -> AppResult<Engine> {
    let cfg = EngineConfig::from_env()
        .map_err(anyhow::Error::msg)
        .context("loading engine configuration from environment")?;
    Ok(build_engine(&cfg)?)
}
