//! Resource bundle value type with elementwise arithmetic and fit checks.

use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::MapperError;

/// Tolerance applied when comparing fractional quantities.
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// A bundle of compute resources: a worker's capacity, a task's requirement,
/// or any ledger column derived from them.
///
/// Arithmetic never yields negative quantities; subtraction clamps each field
/// at zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSpec {
    /// Logical CPU cores (fractional shares allowed).
    pub cpu_cores: f64,
    /// System memory in GB.
    pub memory_gb: f64,
    /// Whole GPU devices.
    pub gpu_count: u32,
    /// GPU memory in GB, summed across devices.
    pub gpu_memory_gb: f64,
    /// Minimum CUDA-style compute capability, e.g. `"8.6"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_compute_capability: Option<String>,
    /// Scratch disk in GB.
    pub disk_gb: f64,
    /// Network bandwidth in Mbps, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_bandwidth_mbps: Option<f64>,
}

impl ResourceSpec {
    /// CPU and memory only; every other quantity is zero.
    pub const fn new(cpu_cores: f64, memory_gb: f64) -> Self {
        Self {
            cpu_cores,
            memory_gb,
            gpu_count: 0,
            gpu_memory_gb: 0.0,
            gpu_compute_capability: None,
            disk_gb: 0.0,
            network_bandwidth_mbps: None,
        }
    }

    /// The empty bundle.
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Set GPU device count and total GPU memory.
    #[must_use]
    pub fn with_gpus(mut self, gpu_count: u32, gpu_memory_gb: f64) -> Self {
        self.gpu_count = gpu_count;
        self.gpu_memory_gb = gpu_memory_gb;
        self
    }

    /// Set scratch disk.
    #[must_use]
    pub fn with_disk(mut self, disk_gb: f64) -> Self {
        self.disk_gb = disk_gb;
        self
    }

    /// Set the GPU compute capability.
    #[must_use]
    pub fn with_compute_capability(mut self, capability: impl Into<String>) -> Self {
        self.gpu_compute_capability = Some(capability.into());
        self
    }

    /// Set network bandwidth.
    #[must_use]
    pub fn with_network(mut self, mbps: f64) -> Self {
        self.network_bandwidth_mbps = Some(mbps);
        self
    }

    /// Elementwise difference, each field floored at zero.
    #[must_use]
    pub fn subtract(&self, other: &Self) -> Self {
        Self {
            cpu_cores: clamp_sub(self.cpu_cores, other.cpu_cores),
            memory_gb: clamp_sub(self.memory_gb, other.memory_gb),
            gpu_count: self.gpu_count.saturating_sub(other.gpu_count),
            gpu_memory_gb: clamp_sub(self.gpu_memory_gb, other.gpu_memory_gb),
            gpu_compute_capability: self.gpu_compute_capability.clone(),
            disk_gb: clamp_sub(self.disk_gb, other.disk_gb),
            network_bandwidth_mbps: match (self.network_bandwidth_mbps, other.network_bandwidth_mbps) {
                (Some(a), Some(b)) => Some(clamp_sub(a, b)),
                (a, None) => a,
                (None, Some(_)) => None,
            },
        }
    }

    /// Whether this requirement is covered by `available`.
    ///
    /// GPU memory is only compared when at least one GPU is requested.
    pub fn fits_within(&self, available: &Self) -> bool {
        le(self.cpu_cores, available.cpu_cores)
            && le(self.memory_gb, available.memory_gb)
            && le(self.disk_gb, available.disk_gb)
            && self.gpu_count <= available.gpu_count
            && (self.gpu_count == 0 || le(self.gpu_memory_gb, available.gpu_memory_gb))
    }

    /// Amount by which this requirement exceeds `available`, per field.
    #[must_use]
    pub fn shortfall(&self, available: &Self) -> Self {
        let mut delta = self.subtract(available);
        if self.gpu_count == 0 {
            delta.gpu_memory_gb = 0.0;
        }
        delta.gpu_compute_capability = None;
        delta.network_bandwidth_mbps = None;
        delta
    }

    /// Name of the first quantity in which `self` exceeds `limit`, if any.
    ///
    /// Unlike [`fits_within`](Self::fits_within) this compares every field,
    /// including GPU memory without requested GPUs.
    pub fn first_excess(&self, limit: &Self) -> Option<&'static str> {
        if !le(self.cpu_cores, limit.cpu_cores) {
            Some("cpu_cores")
        } else if !le(self.memory_gb, limit.memory_gb) {
            Some("memory_gb")
        } else if self.gpu_count > limit.gpu_count {
            Some("gpu_count")
        } else if !le(self.gpu_memory_gb, limit.gpu_memory_gb) {
            Some("gpu_memory_gb")
        } else if !le(self.disk_gb, limit.disk_gb) {
            Some("disk_gb")
        } else {
            None
        }
    }

    /// Whether both bundles request the same quantities, within tolerance.
    ///
    /// GPU memory is only compared when GPUs are requested.
    pub fn same_quantities(&self, other: &Self) -> bool {
        self.gpu_count == other.gpu_count
            && close(self.cpu_cores, other.cpu_cores)
            && close(self.memory_gb, other.memory_gb)
            && (self.gpu_count == 0 || close(self.gpu_memory_gb, other.gpu_memory_gb))
            && close(self.disk_gb, other.disk_gb)
    }

    /// Quantities charged to a ledger for this request.
    ///
    /// GPU memory is dropped when no GPU is requested, and every fractional
    /// field is capped at `headroom`, so a request accepted by
    /// [`fits_within`](Self::fits_within) never books past capacity.
    #[must_use]
    pub fn booked_within(&self, headroom: &Self) -> Self {
        let mut booked = self.clone();
        if booked.gpu_count == 0 {
            booked.gpu_memory_gb = 0.0;
        }
        booked.cpu_cores = booked.cpu_cores.min(headroom.cpu_cores);
        booked.memory_gb = booked.memory_gb.min(headroom.memory_gb);
        booked.gpu_memory_gb = booked.gpu_memory_gb.min(headroom.gpu_memory_gb);
        booked.disk_gb = booked.disk_gb.min(headroom.disk_gb);
        booked
    }

    /// Reject negative or non-finite quantities at the engine boundary.
    pub fn validate(&self) -> Result<(), MapperError> {
        let fields = [
            ("cpu_cores", self.cpu_cores),
            ("memory_gb", self.memory_gb),
            ("gpu_memory_gb", self.gpu_memory_gb),
            ("disk_gb", self.disk_gb),
            ("network_bandwidth_mbps", self.network_bandwidth_mbps.unwrap_or(0.0)),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(MapperError::InvalidSpec(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Flatten into a plain key/value map for transport.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }

    /// Rebuild from a key/value map; missing keys default to zero.
    pub fn from_map(map: Map<String, Value>) -> Result<Self, MapperError> {
        let spec: Self = serde_json::from_value(Value::Object(map))
            .map_err(|e| MapperError::InvalidSpec(format!("malformed resource map: {e}")))?;
        spec.validate()?;
        Ok(spec)
    }
}

/// Elementwise sum. Descriptive fields are taken from the left operand when present.
impl Add for &ResourceSpec {
    type Output = ResourceSpec;

    fn add(self, rhs: Self) -> ResourceSpec {
        ResourceSpec {
            cpu_cores: self.cpu_cores + rhs.cpu_cores,
            memory_gb: self.memory_gb + rhs.memory_gb,
            gpu_count: self.gpu_count.saturating_add(rhs.gpu_count),
            gpu_memory_gb: self.gpu_memory_gb + rhs.gpu_memory_gb,
            gpu_compute_capability: self
                .gpu_compute_capability
                .clone()
                .or_else(|| rhs.gpu_compute_capability.clone()),
            disk_gb: self.disk_gb + rhs.disk_gb,
            network_bandwidth_mbps: match (self.network_bandwidth_mbps, rhs.network_bandwidth_mbps) {
                (Some(a), Some(b)) => Some(a + b),
                (a, b) => a.or(b),
            },
        }
    }
}

impl Sub for &ResourceSpec {
    type Output = ResourceSpec;

    fn sub(self, rhs: Self) -> ResourceSpec {
        self.subtract(rhs)
    }
}

impl fmt::Display for ResourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cpu={:.1} mem={:.1}GB gpu={} gpu_mem={:.1}GB disk={:.1}GB",
            self.cpu_cores, self.memory_gb, self.gpu_count, self.gpu_memory_gb, self.disk_gb
        )
    }
}

fn clamp_sub(a: f64, b: f64) -> f64 {
    (a - b).max(0.0)
}

fn le(required: f64, available: f64) -> bool {
    required <= available + QUANTITY_EPSILON
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() <= QUANTITY_EPSILON
}
