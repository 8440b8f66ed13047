//! Quality-tier scaling tables.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::QualityTier;

/// Resolved scaling profile for one tier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingMultipliers {
    /// CPU core multiplier.
    pub cpu: f64,
    /// System memory multiplier.
    pub memory: f64,
    /// GPU memory multiplier.
    pub gpu_memory: f64,
    /// Run-time multiplier applied to duration estimates.
    pub time: f64,
    /// Scheduling priority; higher runs first.
    pub priority: u8,
}

impl ScalingMultipliers {
    /// The baseline every other tier is measured against.
    pub const STANDARD: Self = Self::uniform(1.0, 1);

    /// Same factor for every resource and for time.
    pub const fn uniform(factor: f64, priority: u8) -> Self {
        Self {
            cpu: factor,
            memory: factor,
            gpu_memory: factor,
            time: factor,
            priority,
        }
    }

    /// Apply the fields set in `overrides`, keeping the rest.
    #[must_use]
    pub fn with_override(self, overrides: &ScalingOverride) -> Self {
        Self {
            cpu: overrides.cpu.unwrap_or(self.cpu),
            memory: overrides.memory.unwrap_or(self.memory),
            gpu_memory: overrides.gpu_memory.unwrap_or(self.gpu_memory),
            time: overrides.time.unwrap_or(self.time),
            priority: self.priority,
        }
    }

    fn factors(&self) -> [(&'static str, f64); 4] {
        [
            ("cpu", self.cpu),
            ("memory", self.memory),
            ("gpu_memory", self.gpu_memory),
            ("time", self.time),
        ]
    }
}

/// Partial multiplier set; unset fields defer to the next source in precedence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScalingOverride {
    /// CPU core multiplier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<f64>,
    /// System memory multiplier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<f64>,
    /// GPU memory multiplier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gpu_memory: Option<f64>,
    /// Run-time multiplier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

impl ScalingOverride {
    fn set_factors(&self) -> impl Iterator<Item = (&'static str, f64)> {
        [
            ("cpu", self.cpu),
            ("memory", self.memory),
            ("gpu_memory", self.gpu_memory),
            ("time", self.time),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }
}

/// One multiplier set per tier. The tier list is fixed by [`QualityTier`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierMultipliers {
    /// Fast previews.
    pub draft: ScalingMultipliers,
    /// Baseline; all factors 1.0.
    pub standard: ScalingMultipliers,
    /// Production renders.
    pub high: ScalingMultipliers,
    /// Final delivery.
    pub ultra: ScalingMultipliers,
}

impl TierMultipliers {
    /// Multipliers for `tier`.
    pub const fn get(&self, tier: QualityTier) -> &ScalingMultipliers {
        match tier {
            QualityTier::Draft => &self.draft,
            QualityTier::Standard => &self.standard,
            QualityTier::High => &self.high,
            QualityTier::Ultra => &self.ultra,
        }
    }
}

impl Default for TierMultipliers {
    fn default() -> Self {
        Self {
            draft: ScalingMultipliers {
                cpu: 0.5,
                memory: 0.5,
                gpu_memory: 0.5,
                time: 0.4,
                priority: 0,
            },
            standard: ScalingMultipliers::STANDARD,
            high: ScalingMultipliers {
                cpu: 1.5,
                memory: 1.5,
                gpu_memory: 1.5,
                time: 2.0,
                priority: 2,
            },
            ultra: ScalingMultipliers {
                cpu: 2.0,
                memory: 2.0,
                gpu_memory: 2.0,
                time: 4.0,
                priority: 3,
            },
        }
    }
}

/// Per-tier overrides for a single task type.
pub type TaskTypeOverrides = BTreeMap<QualityTier, ScalingOverride>;

/// Quality scaling configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityConfig {
    /// Generic multipliers per tier.
    #[serde(default)]
    pub tiers: TierMultipliers,
    /// Task-type specific overrides, keyed by task type name.
    #[serde(default)]
    pub task_overrides: HashMap<String, TaskTypeOverrides>,
}

impl Default for QualityConfig {
    fn default() -> Self {
        let mut task_overrides = HashMap::new();
        task_overrides.insert(
            "image_generation".to_string(),
            overrides([
                (QualityTier::Draft, Some(0.6), Some(0.3)),
                (QualityTier::High, Some(1.3), Some(2.5)),
                (QualityTier::Ultra, Some(1.8), Some(5.0)),
            ]),
        );
        task_overrides.insert(
            "video_generation".to_string(),
            overrides([
                (QualityTier::Draft, Some(0.5), Some(0.25)),
                (QualityTier::High, Some(1.75), Some(3.0)),
                (QualityTier::Ultra, Some(2.5), Some(6.0)),
            ]),
        );
        task_overrides.insert(
            "audio_generation".to_string(),
            overrides([
                (QualityTier::Draft, None, Some(0.5)),
                (QualityTier::High, None, Some(1.5)),
                (QualityTier::Ultra, None, Some(2.0)),
            ]),
        );
        Self {
            tiers: TierMultipliers::default(),
            task_overrides,
        }
    }
}

fn overrides<const N: usize>(
    entries: [(QualityTier, Option<f64>, Option<f64>); N],
) -> TaskTypeOverrides {
    entries
        .into_iter()
        .map(|(tier, gpu_memory, time)| {
            (
                tier,
                ScalingOverride {
                    gpu_memory,
                    time,
                    ..ScalingOverride::default()
                },
            )
        })
        .collect()
}

impl QualityConfig {
    /// Effective multipliers for `tier`, with the task type's overrides applied.
    pub fn resolve(&self, tier: QualityTier, task_type: Option<&str>) -> ScalingMultipliers {
        let base = *self.tiers.get(tier);
        task_type
            .and_then(|t| self.task_overrides.get(t))
            .and_then(|per_tier| per_tier.get(&tier))
            .map_or(base, |o| base.with_override(o))
    }

    /// Validate the tables: positive factors, a 1.0 standard baseline, and
    /// tiers that never shrink from draft to ultra.
    pub fn validate(&self) -> Result<(), String> {
        for tier in QualityTier::ALL {
            for (name, value) in self.tiers.get(tier).factors() {
                check_factor(value).map_err(|e| format!("tier `{tier}` {name}: {e}"))?;
            }
        }

        let standard = self.tiers.standard;
        if standard.factors().iter().any(|(_, v)| (v - 1.0).abs() > f64::EPSILON)
            || standard.priority != ScalingMultipliers::STANDARD.priority
        {
            return Err("tier `standard` must use 1.0 for every factor and priority 1".into());
        }

        check_monotonic(|tier| self.resolve(tier, None))
            .map_err(|e| format!("tier table not monotonic: {e}"))?;

        for (task_type, per_tier) in &self.task_overrides {
            if per_tier.contains_key(&QualityTier::Standard) {
                return Err(format!(
                    "task type `{task_type}` may not override the standard baseline"
                ));
            }
            for (tier, o) in per_tier {
                for (name, value) in o.set_factors() {
                    check_factor(value)
                        .map_err(|e| format!("task type `{task_type}` tier `{tier}` {name}: {e}"))?;
                }
            }
            check_monotonic(|tier| self.resolve(tier, Some(task_type)))
                .map_err(|e| format!("task type `{task_type}` not monotonic: {e}"))?;
        }
        Ok(())
    }

    /// Parse quality configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

fn check_factor(value: f64) -> Result<(), String> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(format!("multiplier must be positive, got {value}"))
    }
}

fn check_monotonic(resolve: impl Fn(QualityTier) -> ScalingMultipliers) -> Result<(), String> {
    for pair in QualityTier::ALL.windows(2) {
        let (lower, upper) = (resolve(pair[0]), resolve(pair[1]));
        for ((name, lo), (_, hi)) in lower.factors().into_iter().zip(upper.factors()) {
            if lo > hi {
                return Err(format!("{name} of `{}` exceeds `{}`", pair[0], pair[1]));
            }
        }
        if lower.priority >= upper.priority {
            return Err(format!("priority of `{}` must be below `{}`", pair[0], pair[1]));
        }
    }
    Ok(())
}
