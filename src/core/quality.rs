//! Quality-tier resource scaling.
//!
//! Generation tasks request a quality tier; the scaler turns a task's
//! standard-quality requirement into the requirement, run time and priority
//! for that tier. Multipliers resolve per field with the precedence
//! `custom override > task-type override > tier`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::{QualityConfig, ScalingMultipliers, ScalingOverride};
use crate::core::{MapperError, ResourceSpec};

/// Smallest quantity a scaled requirement can shrink to.
pub const MIN_SCALED_QUANTITY: f64 = 0.1;

/// Named quality profile, ordered from cheapest to most expensive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    /// Fast, low-fidelity previews.
    Draft,
    /// The baseline profile.
    Standard,
    /// Production quality.
    High,
    /// Maximum fidelity for final delivery.
    Ultra,
}

impl QualityTier {
    /// Every tier, lowest first.
    pub const ALL: [Self; 4] = [Self::Draft, Self::Standard, Self::High, Self::Ultra];

    /// Wire name of the tier.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Standard => "standard",
            Self::High => "high",
            Self::Ultra => "ultra",
        }
    }

    /// Human-readable summary for UIs.
    pub const fn description(self) -> &'static str {
        match self {
            Self::Draft => "Fast preview with reduced resources and lower fidelity",
            Self::Standard => "Balanced quality and resource usage",
            Self::High => "Production quality with increased resources",
            Self::Ultra => "Maximum quality for final delivery",
        }
    }

    /// Parse a tier name, treating unknown names as [`QualityTier::Standard`].
    pub fn parse_or_standard(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            tracing::debug!(quality = name, "unknown quality tier, using standard");
            Self::Standard
        })
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = Self::ALL.iter().map(|t| t.as_str()).collect();
                format!("unknown quality tier `{s}`; expected one of {}", valid.join(", "))
            })
    }
}

/// Description of a tier for comparison UIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityInfo {
    /// Whether the requested name is a known tier.
    pub valid: bool,
    /// The resolved tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<QualityTier>,
    /// Generic multipliers of the tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multipliers: Option<ScalingMultipliers>,
    /// Scheduling priority of the tier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<u8>,
    /// Human-readable summary.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Why the name was rejected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Stateless scaling of resource requirements by quality tier.
#[derive(Debug, Clone, Default)]
pub struct QualityResourceScaler {
    config: QualityConfig,
}

impl QualityResourceScaler {
    /// Build a scaler from validated tables.
    pub fn new(config: QualityConfig) -> Result<Self, MapperError> {
        config.validate().map_err(MapperError::InvalidConfig)?;
        Ok(Self { config })
    }

    /// The scaling tables in use.
    pub const fn config(&self) -> &QualityConfig {
        &self.config
    }

    /// Effective multipliers after applying task-type and custom overrides.
    pub fn multipliers(
        &self,
        quality: QualityTier,
        task_type: Option<&str>,
        custom_scaling: Option<&ScalingOverride>,
    ) -> ScalingMultipliers {
        let resolved = self.config.resolve(quality, task_type);
        custom_scaling.map_or(resolved, |custom| resolved.with_override(custom))
    }

    /// Requirement for `quality`, given the standard-quality `base`.
    ///
    /// Only CPU, memory and GPU memory scale. GPU count, disk and descriptive
    /// fields pass through unchanged.
    pub fn scale_requirements(
        &self,
        base: &ResourceSpec,
        quality: QualityTier,
        task_type: Option<&str>,
        custom_scaling: Option<&ScalingOverride>,
    ) -> ResourceSpec {
        let m = self.multipliers(quality, task_type, custom_scaling);
        ResourceSpec {
            cpu_cores: scale_quantity(base.cpu_cores, m.cpu),
            memory_gb: scale_quantity(base.memory_gb, m.memory),
            gpu_memory_gb: scale_quantity(base.gpu_memory_gb, m.gpu_memory),
            ..base.clone()
        }
    }

    /// Expected run time in seconds at `quality`, given the standard-quality estimate.
    pub fn estimate_duration(
        &self,
        base_seconds: f64,
        quality: QualityTier,
        task_type: Option<&str>,
    ) -> f64 {
        base_seconds * self.config.resolve(quality, task_type).time
    }

    /// Scheduling priority of `quality`.
    pub const fn get_priority(&self, quality: QualityTier) -> u8 {
        self.config.tiers.get(quality).priority
    }

    /// Highest tier at or below `preferred` whose scaled requirement fits in
    /// `available`. Falls back to the lowest tier when nothing fits.
    pub fn recommend_quality(
        &self,
        available: &ResourceSpec,
        required: &ResourceSpec,
        preferred: QualityTier,
    ) -> QualityTier {
        QualityTier::ALL
            .into_iter()
            .rev()
            .filter(|tier| *tier <= preferred)
            .find(|tier| {
                self.scale_requirements(required, *tier, None, None)
                    .fits_within(available)
            })
            .unwrap_or_else(|| {
                tracing::debug!(%preferred, "no tier fits available resources, recommending draft");
                QualityTier::Draft
            })
    }

    /// Tier details for `quality`, or an invalid marker for unknown names.
    pub fn get_quality_info(&self, quality: &str) -> QualityInfo {
        match quality.parse::<QualityTier>() {
            Ok(tier) => {
                let multipliers = *self.config.tiers.get(tier);
                QualityInfo {
                    valid: true,
                    tier: Some(tier),
                    multipliers: Some(multipliers),
                    priority: Some(multipliers.priority),
                    description: Some(tier.description().to_string()),
                    error: None,
                }
            }
            Err(error) => QualityInfo {
                valid: false,
                tier: None,
                multipliers: None,
                priority: None,
                description: None,
                error: Some(error),
            },
        }
    }

    /// Scaled requirement for every tier.
    pub fn get_all_quality_requirements(
        &self,
        base: &ResourceSpec,
        task_type: Option<&str>,
    ) -> BTreeMap<QualityTier, ResourceSpec> {
        QualityTier::ALL
            .into_iter()
            .map(|tier| (tier, self.scale_requirements(base, tier, task_type, None)))
            .collect()
    }
}

/// Scale, round to one decimal, and floor at [`MIN_SCALED_QUANTITY`].
fn scale_quantity(base: f64, factor: f64) -> f64 {
    ((base * factor * 10.0).round() / 10.0).max(MIN_SCALED_QUANTITY)
}
