//! Sensor configuration.
//!
//! Loaded from TOML; every field has a default, so an empty file is valid.
//!
//! ```toml
//! i2c_address = 0x1a
//! xclk_rate_hz = 24000000
//! settle_delay_us = 5000
//! replay_controls = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::power::PowerTiming;
use crate::registers::IMX377_ADDR;
use crate::validation::{validate_config, ValidationError};

/// Per-device configuration supplied by the platform binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensorConfig {
    /// 7-bit bus address of the sensor.
    pub i2c_address: u8,
    /// Input clock rate programmed before power-up.
    pub xclk_rate_hz: u32,
    /// Wait after power-up before register traffic.
    pub settle_delay_us: u32,
    /// Write stored gain and exposure during stream start.
    pub replay_controls: bool,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            i2c_address: IMX377_ADDR,
            xclk_rate_hz: 24_000_000,
            settle_delay_us: 5_000,
            replay_controls: true,
        }
    }
}

impl SensorConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check every field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_config(self)
    }

    /// Power sequencing parameters.
    pub const fn power_timing(&self) -> PowerTiming {
        PowerTiming {
            xclk_rate_hz: self.xclk_rate_hz,
            settle_delay_us: self.settle_delay_us,
        }
    }
}
