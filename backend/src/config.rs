//! Per-route configuration
//!
//! One `RouteConfig` instance governs one route's engine for its whole
//! lifetime. It is validated at engine construction; a config error is the
//! only fatal error class in the crate, and it can only fire before the
//! scheduling loop starts.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// No holding instruction may exceed an hour; the solver's grid (and any
/// dispatcher's patience) scales with this bound.
const MAX_HOLDING_CAP_SECS: f64 = 3600.0;

/// Configuration failure. Fatal, and only possible at startup.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The configuration document could not be parsed
    #[error("failed to parse route configuration: {0}")]
    Parse(String),

    /// A parsed field carries a semantically invalid value
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Operating parameters for one route's holding engine.
///
/// Only `route_id` and `target_headway_secs` are required in a config
/// document; every other field has an operational default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteConfig {
    /// Route this engine controls
    pub route_id: String,

    /// Planned time gap between consecutive vehicles, seconds
    pub target_headway_secs: f64,

    /// Hard floor on any projected headway after holding, seconds
    #[serde(default = "defaults::min_headway_secs")]
    pub min_headway_secs: f64,

    /// Upper bound on a single holding instruction, seconds (at most 3600)
    #[serde(default = "defaults::max_holding_secs")]
    pub max_holding_secs: f64,

    /// Nominal passenger capacity per vehicle
    #[serde(default = "defaults::vehicle_capacity")]
    pub vehicle_capacity: u32,

    /// w1: weight on passenger wait cost
    #[serde(default = "defaults::wait_weight")]
    pub wait_weight: f64,

    /// w2: weight on schedule-deviation cost
    #[serde(default = "defaults::schedule_weight")]
    pub schedule_weight: f64,

    /// w3: weight on headway-deviation (bunching) cost
    #[serde(default = "defaults::bunching_weight")]
    pub bunching_weight: f64,

    /// Fraction of the target headway below which a pair counts as bunched,
    /// strictly between 0 and 1
    #[serde(default = "defaults::bunching_threshold_fraction")]
    pub bunching_threshold_fraction: f64,

    /// |delay + holding| tolerance for the on-time metric, seconds
    #[serde(default = "defaults::on_time_tolerance_secs")]
    pub on_time_tolerance_secs: f64,

    /// Mean distance between consecutive stops, metres; used to estimate
    /// headways when the feed carries no arrival predictions
    #[serde(default = "defaults::stop_spacing_m")]
    pub stop_spacing_m: f64,

    /// Wall-clock budget for one solve, milliseconds
    #[serde(default = "defaults::solver_budget_ms")]
    pub solver_budget_ms: u64,

    /// Seconds between scheduled cycles
    #[serde(default = "defaults::cycle_interval_secs")]
    pub cycle_interval_secs: u64,

    /// Cycle comparisons retained in the metrics ring buffer
    #[serde(default = "defaults::history_capacity")]
    pub history_capacity: usize,
}

mod defaults {
    pub fn min_headway_secs() -> f64 {
        60.0
    }
    pub fn max_holding_secs() -> f64 {
        180.0
    }
    pub fn vehicle_capacity() -> u32 {
        50
    }
    pub fn wait_weight() -> f64 {
        1.0
    }
    pub fn schedule_weight() -> f64 {
        0.5
    }
    pub fn bunching_weight() -> f64 {
        2.0
    }
    pub fn bunching_threshold_fraction() -> f64 {
        0.4
    }
    pub fn on_time_tolerance_secs() -> f64 {
        120.0
    }
    pub fn stop_spacing_m() -> f64 {
        500.0
    }
    pub fn solver_budget_ms() -> u64 {
        300
    }
    pub fn cycle_interval_secs() -> u64 {
        30
    }
    pub fn history_capacity() -> usize {
        240
    }
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            route_id: "default".to_string(),
            target_headway_secs: 300.0,
            min_headway_secs: defaults::min_headway_secs(),
            max_holding_secs: defaults::max_holding_secs(),
            vehicle_capacity: defaults::vehicle_capacity(),
            wait_weight: defaults::wait_weight(),
            schedule_weight: defaults::schedule_weight(),
            bunching_weight: defaults::bunching_weight(),
            bunching_threshold_fraction: defaults::bunching_threshold_fraction(),
            on_time_tolerance_secs: defaults::on_time_tolerance_secs(),
            stop_spacing_m: defaults::stop_spacing_m(),
            solver_budget_ms: defaults::solver_budget_ms(),
            cycle_interval_secs: defaults::cycle_interval_secs(),
            history_capacity: defaults::history_capacity(),
        }
    }
}

impl RouteConfig {
    /// Parse and validate a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field for semantic validity.
    ///
    /// The engine calls this at construction; callers building a config in
    /// code can call it directly.
    pub fn validate(&self) -> Result<(), ConfigError> {
        fn finite(field: &'static str, value: f64) -> Result<(), ConfigError> {
            if value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be finite, got {value}"),
                })
            }
        }

        if self.route_id.is_empty() {
            return Err(ConfigError::Invalid {
                field: "route_id",
                reason: "must not be empty".to_string(),
            });
        }

        finite("target_headway_secs", self.target_headway_secs)?;
        if self.target_headway_secs <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "target_headway_secs",
                reason: format!("must be positive, got {}", self.target_headway_secs),
            });
        }

        finite("min_headway_secs", self.min_headway_secs)?;
        if self.min_headway_secs < 0.0 || self.min_headway_secs >= self.target_headway_secs {
            return Err(ConfigError::Invalid {
                field: "min_headway_secs",
                reason: format!(
                    "must be in [0, target_headway_secs), got {}",
                    self.min_headway_secs
                ),
            });
        }

        finite("max_holding_secs", self.max_holding_secs)?;
        if self.max_holding_secs < 0.0 || self.max_holding_secs > MAX_HOLDING_CAP_SECS {
            return Err(ConfigError::Invalid {
                field: "max_holding_secs",
                reason: format!(
                    "must be in [0, {MAX_HOLDING_CAP_SECS}], got {}",
                    self.max_holding_secs
                ),
            });
        }

        if self.vehicle_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "vehicle_capacity",
                reason: "must be positive".to_string(),
            });
        }

        for (field, value) in [
            ("wait_weight", self.wait_weight),
            ("schedule_weight", self.schedule_weight),
            ("bunching_weight", self.bunching_weight),
        ] {
            finite(field, value)?;
            if value < 0.0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("must be non-negative, got {value}"),
                });
            }
        }

        finite("bunching_threshold_fraction", self.bunching_threshold_fraction)?;
        if self.bunching_threshold_fraction <= 0.0 || self.bunching_threshold_fraction >= 1.0 {
            return Err(ConfigError::Invalid {
                field: "bunching_threshold_fraction",
                reason: format!(
                    "must be strictly between 0 and 1, got {}",
                    self.bunching_threshold_fraction
                ),
            });
        }

        finite("on_time_tolerance_secs", self.on_time_tolerance_secs)?;
        if self.on_time_tolerance_secs < 0.0 {
            return Err(ConfigError::Invalid {
                field: "on_time_tolerance_secs",
                reason: format!("must be non-negative, got {}", self.on_time_tolerance_secs),
            });
        }

        finite("stop_spacing_m", self.stop_spacing_m)?;
        if self.stop_spacing_m <= 0.0 {
            return Err(ConfigError::Invalid {
                field: "stop_spacing_m",
                reason: format!("must be positive, got {}", self.stop_spacing_m),
            });
        }

        if self.solver_budget_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "solver_budget_ms",
                reason: "must be positive".to_string(),
            });
        }

        if self.cycle_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "cycle_interval_secs",
                reason: "must be positive".to_string(),
            });
        }

        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "history_capacity",
                reason: "must be positive".to_string(),
            });
        }

        Ok(())
    }

    /// Absolute bunching threshold in seconds:
    /// `bunching_threshold_fraction x target_headway_secs`.
    pub fn bunching_threshold_secs(&self) -> f64 {
        self.bunching_threshold_fraction * self.target_headway_secs
    }
}
