//! API-facing request/response models and collaborator sequencing.
//!
//! The engine itself never talks to GPU devices or usage predictors. This
//! module is where an HTTP layer sequences those collaborators around
//! [`ResourceMapper::allocate`] and [`ResourceMapper::release`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ScalingOverride;
use crate::core::{
    Allocation, AllocationConstraints, AllocationStrategy, ErrorKind, MapperError,
    QualityResourceScaler, QualityTier, ResourceMapper, ResourceSpec, ResourceStatus,
};
use crate::util::serde::{AllocationId, TaskId};

/// Physical GPU device manager.
#[async_trait]
pub trait GpuManager: Send + Sync {
    /// Claim `count` devices with `memory_per_gpu_gb` free each. `None` when
    /// the request cannot be met.
    async fn allocate_multi_gpu(
        &self,
        count: u32,
        memory_per_gpu_gb: f64,
        compute_capability: Option<&str>,
    ) -> Option<Vec<u32>>;

    /// Return `memory_gb` on device `device`.
    async fn release_gpu(&self, device: u32, memory_gb: f64);
}

/// Historical resource usage predictor.
#[async_trait]
pub trait ResourceMonitor: Send + Sync {
    /// Predicted standard-quality requirement for a task type.
    async fn predict_resource_needs(&self, task_type: &str) -> Option<ResourcePrediction>;

    /// Current utilization summary, opaque to the engine.
    async fn get_utilization_summary(&self) -> serde_json::Value;

    /// Usage trends over the trailing `window`, opaque to the engine.
    async fn get_resource_trends(&self, window: Duration) -> serde_json::Value;
}

/// Requirement predicted from past runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourcePrediction {
    /// Standard-quality requirement.
    pub requirements: ResourceSpec,
    /// Standard-quality run time, if known.
    pub estimated_duration_secs: Option<f64>,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Request to place a generation task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlacementRequest {
    /// Task identifier.
    pub task_id: TaskId,
    /// Task type, selecting scaling overrides and predictions.
    #[serde(default)]
    pub task_type: Option<String>,
    /// Quality tier name; unknown names run at standard.
    #[serde(default = "default_quality")]
    pub quality: String,
    /// Standard-quality requirement. Predicted when absent.
    #[serde(default)]
    pub base_requirements: Option<ResourceSpec>,
    /// Standard-quality run time in seconds.
    #[serde(default)]
    pub base_duration_secs: Option<f64>,
    /// Per-request multiplier overrides.
    #[serde(default)]
    pub custom_scaling: Option<ScalingOverride>,
    /// Placement filters.
    #[serde(default)]
    pub constraints: Option<AllocationConstraints>,
    /// Strategy override.
    #[serde(default)]
    pub strategy: Option<AllocationStrategy>,
}

fn default_quality() -> String {
    QualityTier::Standard.to_string()
}

impl TaskPlacementRequest {
    /// Request with explicit base requirements at `quality`.
    pub fn new(task_id: impl Into<TaskId>, quality: QualityTier, base: ResourceSpec) -> Self {
        Self {
            task_id: task_id.into(),
            task_type: None,
            quality: quality.to_string(),
            base_requirements: Some(base),
            base_duration_secs: None,
            custom_scaling: None,
            constraints: None,
            strategy: None,
        }
    }
}

/// Result of a successful placement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskPlacement {
    /// The committed allocation, GPU devices included.
    pub allocation: Allocation,
    /// Tier the task runs at.
    pub quality: QualityTier,
    /// Scheduling priority of the tier.
    pub priority: u8,
    /// Scaled run-time estimate, when a base estimate was known.
    pub estimated_duration_secs: Option<f64>,
}

/// Status plus whatever the usage monitor reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceReport {
    /// Engine ledger summary.
    pub status: ResourceStatus,
    /// Monitor utilization summary.
    pub utilization_summary: Option<serde_json::Value>,
    /// Monitor trends.
    pub trends: Option<serde_json::Value>,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Registered workers.
    pub workers: usize,
    /// Live allocations.
    pub active_allocations: usize,
    /// Whether the expiry sweeper is running.
    pub sweeper_running: bool,
}

/// Errors surfaced to the API layer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Engine error.
    #[error(transparent)]
    Mapper(#[from] MapperError),
    /// No registered worker can take the task.
    #[error("no worker has capacity for task {task_id}")]
    NoCapacity {
        /// Task that was being placed.
        task_id: TaskId,
    },
    /// Neither the request nor the monitor supplied requirements.
    #[error("no resource requirements supplied or predicted for task {task_id}")]
    MissingRequirements {
        /// Task that was being placed.
        task_id: TaskId,
    },
    /// The GPU manager could not back a committed allocation.
    #[error("GPU manager could not provide {count} device(s) for allocation {allocation_id}")]
    GpuUnavailable {
        /// Allocation that was rolled back.
        allocation_id: AllocationId,
        /// Devices requested.
        count: u32,
    },
}

impl ApiError {
    /// HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Mapper(e) => match e.kind() {
                ErrorKind::CapacityShortfall => 503,
                ErrorKind::Conflict => 409,
                ErrorKind::NotFound => 404,
                ErrorKind::InvalidInput => 400,
                ErrorKind::Internal => 500,
            },
            Self::NoCapacity { .. } | Self::GpuUnavailable { .. } => 503,
            Self::MissingRequirements { .. } => 422,
        }
    }
}

/// Scale, select a worker, allocate, then claim GPU devices.
///
/// If another caller takes the chosen worker's capacity between selection
/// and allocation, that worker is excluded and selection repeats. If the GPU
/// manager cannot supply devices, the allocation is released again.
pub async fn place_task(
    mapper: &ResourceMapper,
    scaler: &QualityResourceScaler,
    gpu: Option<&dyn GpuManager>,
    monitor: Option<&dyn ResourceMonitor>,
    req: TaskPlacementRequest,
) -> Result<TaskPlacement, ApiError> {
    let quality = QualityTier::parse_or_standard(&req.quality);
    let task_type = req.task_type.as_deref();

    let mut base_duration = req.base_duration_secs;
    let base = match (req.base_requirements, task_type, monitor) {
        (Some(base), _, _) => base,
        (None, Some(task_type), Some(monitor)) => {
            let prediction = monitor
                .predict_resource_needs(task_type)
                .await
                .ok_or_else(|| ApiError::MissingRequirements {
                    task_id: req.task_id.clone(),
                })?;
            tracing::debug!(
                task_type,
                confidence = prediction.confidence,
                "using predicted requirements"
            );
            base_duration = base_duration.or(prediction.estimated_duration_secs);
            prediction.requirements
        }
        _ => {
            return Err(ApiError::MissingRequirements {
                task_id: req.task_id,
            })
        }
    };

    base.validate()?;
    let scaled = scaler.scale_requirements(&base, quality, task_type, req.custom_scaling.as_ref());
    let estimated_duration_secs =
        base_duration.map(|secs| scaler.estimate_duration(secs, quality, task_type));
    let duration_estimate = estimated_duration_secs.and_then(|s| Duration::try_from_secs_f64(s).ok());

    let mut constraints = req.constraints.unwrap_or_default();
    let mut allocation = loop {
        let Some(worker_id) = mapper.find_worker(&scaled, Some(&constraints), req.strategy) else {
            return Err(ApiError::NoCapacity {
                task_id: req.task_id,
            });
        };
        match mapper.allocate(&worker_id, &scaled, req.task_id.clone(), duration_estimate, None) {
            Ok(allocation) => break allocation,
            Err(MapperError::InsufficientResources { .. }) => {
                tracing::debug!(worker_id = %worker_id, "lost placement race, reselecting");
                constraints.exclude_workers.push(worker_id);
            }
            Err(e) => return Err(e.into()),
        }
    };

    if scaled.gpu_count > 0 {
        if let Some(gpu) = gpu {
            let per_gpu = scaled.gpu_memory_gb / f64::from(scaled.gpu_count);
            let devices = gpu
                .allocate_multi_gpu(
                    scaled.gpu_count,
                    per_gpu,
                    scaled.gpu_compute_capability.as_deref(),
                )
                .await;
            let Some(devices) = devices else {
                if let Err(e) = mapper.release(allocation.id) {
                    tracing::error!(allocation_id = %allocation.id, error = %e, "rollback failed");
                }
                return Err(ApiError::GpuUnavailable {
                    allocation_id: allocation.id,
                    count: scaled.gpu_count,
                });
            };
            allocation = mapper.attach_gpu_devices(allocation.id, devices)?;
        }
    }

    Ok(TaskPlacement {
        allocation,
        quality,
        priority: scaler.get_priority(quality),
        estimated_duration_secs,
    })
}

/// Release an allocation and hand its GPU devices back.
pub async fn release_task(
    mapper: &ResourceMapper,
    gpu: Option<&dyn GpuManager>,
    allocation_id: AllocationId,
) -> Result<Allocation, ApiError> {
    let allocation = mapper.release(allocation_id)?;
    if let (Some(gpu), false) = (gpu, allocation.gpu_devices.is_empty()) {
        let device_count = u32::try_from(allocation.gpu_devices.len()).unwrap_or(u32::MAX);
        let per_device = allocation.requirements.gpu_memory_gb / f64::from(device_count);
        for device in &allocation.gpu_devices {
            gpu.release_gpu(*device, per_device).await;
        }
    }
    Ok(allocation)
}

/// Ledger status enriched with the monitor's view.
pub async fn resource_report(
    mapper: &ResourceMapper,
    monitor: Option<&dyn ResourceMonitor>,
    trend_window: Duration,
) -> ResourceReport {
    let status = mapper.get_resource_status();
    let (utilization_summary, trends) = match monitor {
        Some(monitor) => (
            Some(monitor.get_utilization_summary().await),
            Some(monitor.get_resource_trends(trend_window).await),
        ),
        None => (None, None),
    };
    ResourceReport {
        status,
        utilization_summary,
        trends,
    }
}

/// Return a health payload.
pub fn health(mapper: &ResourceMapper) -> Health {
    let status = mapper.get_resource_status();
    Health {
        ok: true,
        workers: status.worker_count,
        active_allocations: status.active_allocations,
        sweeper_running: mapper.is_running(),
    }
}
