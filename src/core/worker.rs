//! Per-worker capacity ledger.

use serde::{Deserialize, Serialize};

use crate::core::{MapperError, ResourceSpec};
use crate::util::clock::now_ms;
use crate::util::serde::WorkerId;

/// Percentage of each capacity dimension currently allocated.
///
/// A dimension is `None` when the worker has no capacity in it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Utilization {
    /// Allocated share of CPU cores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_percent: Option<f64>,
    /// Allocated share of system memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_percent: Option<f64>,
    /// Allocated share of GPU devices.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_percent: Option<f64>,
    /// Allocated share of GPU memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_memory_percent: Option<f64>,
}

impl Utilization {
    /// Share of `total` taken by `allocated`. GPU dimensions are reported only
    /// when `total` has GPUs.
    pub fn from_ledger(total: &ResourceSpec, allocated: &ResourceSpec) -> Self {
        let has_gpus = total.gpu_count > 0;
        Self {
            cpu_percent: percent(allocated.cpu_cores, total.cpu_cores),
            memory_percent: percent(allocated.memory_gb, total.memory_gb),
            gpu_percent: has_gpus
                .then(|| percent(f64::from(allocated.gpu_count), f64::from(total.gpu_count)))
                .flatten(),
            gpu_memory_percent: has_gpus
                .then(|| percent(allocated.gpu_memory_gb, total.gpu_memory_gb))
                .flatten(),
        }
    }
}

/// Capacity ledger for one worker: what it has, what is granted, what is held.
///
/// Availability is always derived, never stored. The owning mapper keeps
/// `allocated + reserved <= total` in every field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResources {
    /// Registry key.
    pub worker_id: WorkerId,
    /// Full capacity.
    pub total: ResourceSpec,
    /// Sum of live allocations.
    pub allocated: ResourceSpec,
    /// Sum of live reservations.
    pub reserved: ResourceSpec,
    /// GPU model name, e.g. `"A100"`, used for placement constraints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_type: Option<String>,
    /// Registration timestamp in milliseconds since epoch.
    pub registered_at_ms: u128,
}

impl WorkerResources {
    /// Fresh ledger with nothing allocated or reserved.
    pub fn new(worker_id: impl Into<WorkerId>, total: ResourceSpec) -> Self {
        Self {
            worker_id: worker_id.into(),
            total,
            allocated: ResourceSpec::zero(),
            reserved: ResourceSpec::zero(),
            gpu_type: None,
            registered_at_ms: now_ms(),
        }
    }

    /// Tag the worker with its GPU model.
    #[must_use]
    pub fn with_gpu_type(mut self, gpu_type: impl Into<String>) -> Self {
        self.gpu_type = Some(gpu_type.into());
        self
    }

    /// `total - allocated - reserved`, floored at zero per field.
    pub fn available(&self) -> ResourceSpec {
        self.total.subtract(&self.allocated).subtract(&self.reserved)
    }

    /// Whether `requirements` fits in what is currently available.
    pub fn can_allocate(&self, requirements: &ResourceSpec) -> bool {
        requirements.fits_within(&self.available())
    }

    /// Allocated percentage per dimension; zero-capacity dimensions are omitted.
    pub fn utilization(&self) -> Utilization {
        Utilization::from_ledger(&self.total, &self.allocated)
    }

    /// Whether the worker's GPUs meet `required` (`major.minor`, compared numerically).
    ///
    /// Capabilities that do not parse must match exactly.
    pub fn supports_compute_capability(&self, required: &str) -> bool {
        let Some(actual) = self.total.gpu_compute_capability.as_deref() else {
            return false;
        };
        match (parse_capability(actual), parse_capability(required)) {
            (Some(have), Some(need)) => have >= need,
            _ => actual == required,
        }
    }

    /// Replace the allocated and reserved columns, refusing any state where
    /// `allocated + reserved` exceeds `total`.
    pub(crate) fn commit(
        &mut self,
        allocated: ResourceSpec,
        reserved: ResourceSpec,
    ) -> Result<(), MapperError> {
        let committed = &allocated + &reserved;
        if let Some(field) = committed.first_excess(&self.total) {
            tracing::error!(
                worker_id = %self.worker_id,
                field,
                committed = %committed,
                total = %self.total,
                "refusing ledger update that exceeds worker capacity"
            );
            return Err(MapperError::InvariantViolation {
                worker_id: self.worker_id.clone(),
                detail: format!("{field}: committed {committed} exceeds total {}", self.total),
            });
        }
        self.allocated = allocated;
        self.reserved = reserved;
        Ok(())
    }
}

fn percent(used: f64, capacity: f64) -> Option<f64> {
    (capacity > 0.0).then(|| used / capacity * 100.0)
}

fn parse_capability(raw: &str) -> Option<(u32, u32)> {
    let mut parts = raw.trim().splitn(2, '.');
    let major = parts.next()?.parse().ok()?;
    let minor = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    Some((major, minor))
}
