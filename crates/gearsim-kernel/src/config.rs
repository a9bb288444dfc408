//! Simulation configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML could not be parsed into a [`SimConfig`].
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A field failed validation.
    #[error("invalid value for {field}: {message}")]
    InvalidValue {
        /// Offending field.
        field: &'static str,
        /// What is wrong with it.
        message: String,
    },
}

/// Largest accepted [`SimConfig::placement_extent`].
pub const MAX_PLACEMENT_EXTENT: f64 = 1.0e6;

/// Fixed-step simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Physics step in seconds.
    pub dt: f64,
    /// Physics steps per frame.
    pub substeps: u32,
    /// Gravity vector (m/s^2).
    pub gravity: [f64; 3],
    /// Half-width of the square in which new gears are randomly placed.
    pub placement_extent: f64,
    /// Seed for random placement.
    pub seed: u64,
    /// Body density (kg/m^3).
    pub density: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 1.0 / 60.0,
            substeps: 1,
            gravity: [0.0, 0.0, 0.0],
            placement_extent: 20.0,
            seed: 0,
            density: 1000.0,
        }
    }
}

impl SimConfig {
    /// Parse and validate a TOML document. Missing keys take defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt.is_finite() && self.dt > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "dt",
                message: format!("{} (must be > 0)", self.dt),
            });
        }
        if self.substeps == 0 {
            return Err(ConfigError::InvalidValue {
                field: "substeps",
                message: "must be at least 1".into(),
            });
        }
        if self.gravity.iter().any(|g| !g.is_finite()) {
            return Err(ConfigError::InvalidValue {
                field: "gravity",
                message: format!("{:?} (components must be finite)", self.gravity),
            });
        }
        if !(0.0..=MAX_PLACEMENT_EXTENT).contains(&self.placement_extent) {
            return Err(ConfigError::InvalidValue {
                field: "placement_extent",
                message: format!(
                    "{} (must be between 0 and {MAX_PLACEMENT_EXTENT})",
                    self.placement_extent
                ),
            });
        }
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "density",
                message: format!("{} (must be > 0)", self.density),
            });
        }
        Ok(())
    }
}
