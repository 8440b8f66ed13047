//! Resource mapper runtime settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::AllocationStrategy;

/// Environment variable selecting the default allocation strategy.
pub const ENV_STRATEGY: &str = "RESOURCE_MAPPER_STRATEGY";
/// Environment variable for the expiry sweep interval, in seconds.
pub const ENV_SWEEP_INTERVAL_SECS: &str = "RESOURCE_MAPPER_SWEEP_INTERVAL_SECS";
/// Environment variable for the default reservation lifetime, in seconds.
pub const ENV_RESERVATION_SECS: &str = "RESOURCE_MAPPER_RESERVATION_SECS";

const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;
const DEFAULT_RESERVATION_SECS: u64 = 300;

/// Mapper configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapperConfig {
    /// Strategy used when a caller does not pick one.
    #[serde(default)]
    pub default_strategy: AllocationStrategy,
    /// Seconds between expiry sweeps.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// Reservation lifetime when the caller does not supply one.
    #[serde(default = "default_reservation_secs")]
    pub default_reservation_secs: u64,
}

const fn default_sweep_interval_secs() -> u64 {
    DEFAULT_SWEEP_INTERVAL_SECS
}

const fn default_reservation_secs() -> u64 {
    DEFAULT_RESERVATION_SECS
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            default_strategy: AllocationStrategy::default(),
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            default_reservation_secs: DEFAULT_RESERVATION_SECS,
        }
    }
}

impl MapperConfig {
    /// Validate mapper configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.sweep_interval_secs == 0 {
            return Err("sweep_interval_secs must be greater than 0".into());
        }
        if self.default_reservation_secs == 0 {
            return Err("default_reservation_secs must be greater than 0".into());
        }
        Ok(())
    }

    /// Interval between expiry sweeps.
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Lifetime of a reservation created without an explicit duration.
    pub const fn default_reservation_ttl(&self) -> Duration {
        Duration::from_secs(self.default_reservation_secs)
    }

    /// Build from key lookups (normally the process environment), starting
    /// from defaults for anything unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut cfg = Self::default();
        if let Some(raw) = lookup(ENV_STRATEGY) {
            cfg.default_strategy = raw.parse()?;
        }
        if let Some(raw) = lookup(ENV_SWEEP_INTERVAL_SECS) {
            cfg.sweep_interval_secs = parse_secs(ENV_SWEEP_INTERVAL_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_RESERVATION_SECS) {
            cfg.default_reservation_secs = parse_secs(ENV_RESERVATION_SECS, &raw)?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<u64, String> {
    raw.trim()
        .parse()
        .map_err(|e| format!("{key} must be a whole number of seconds: {e}"))
}
