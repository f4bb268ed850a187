//! Validation of configuration values and mode descriptors.

use thiserror::Error;

use crate::config::SensorConfig;
use crate::mode::Mode;

/// Accepted input clock range.
pub const XCLK_RATE_RANGE_HZ: std::ops::RangeInclusive<u32> = 6_000_000..=27_000_000;

/// Accepted settle interval after power-up.
pub const SETTLE_DELAY_RANGE_US: std::ops::RangeInclusive<u32> = 5_000..=10_000;

/// A value outside what the sensor or bus accepts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Not a 7-bit bus address, or a reserved one.
    #[error("i2c address {0:#04x} is not a usable 7-bit address")]
    InvalidAddress(u8),
    /// Input clock outside the supported range.
    #[error("xclk rate {0} Hz outside 6-27 MHz")]
    InvalidClockRate(u32),
    /// Settle interval outside the datasheet window.
    #[error("settle delay {0} us outside 5000-10000 us")]
    InvalidSettleDelay(u32),
    /// Mode descriptor with zero geometry or timing.
    #[error("mode {width}x{height} has zero size or timing")]
    InvalidMode {
        /// Mode width.
        width: u32,
        /// Mode height.
        height: u32,
    },
}

/// Check a 7-bit bus address, rejecting the reserved 0x00-0x07 and 0x78-0x7F blocks.
pub fn validate_address(address: u8) -> Result<(), ValidationError> {
    if (0x08..=0x77).contains(&address) {
        Ok(())
    } else {
        Err(ValidationError::InvalidAddress(address))
    }
}

/// Check the input clock rate.
pub fn validate_clock_rate(rate_hz: u32) -> Result<(), ValidationError> {
    if XCLK_RATE_RANGE_HZ.contains(&rate_hz) {
        Ok(())
    } else {
        Err(ValidationError::InvalidClockRate(rate_hz))
    }
}

/// Check the settle interval.
pub fn validate_settle_delay(delay_us: u32) -> Result<(), ValidationError> {
    if SETTLE_DELAY_RANGE_US.contains(&delay_us) {
        Ok(())
    } else {
        Err(ValidationError::InvalidSettleDelay(delay_us))
    }
}

/// Check every field of a config.
pub fn validate_config(config: &SensorConfig) -> Result<(), ValidationError> {
    validate_address(config.i2c_address)?;
    validate_clock_rate(config.xclk_rate_hz)?;
    validate_settle_delay(config.settle_delay_us)
}

/// Check a mode descriptor: non-zero geometry, HTS and VTS.
pub const fn validate_mode(mode: &Mode) -> Result<(), ValidationError> {
    if mode.width == 0 || mode.height == 0 || mode.hts == 0 || mode.vts == 0 {
        Err(ValidationError::InvalidMode {
            width: mode.width,
            height: mode.height,
        })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::{supported_modes, DEFAULT_MODE};

    #[test]
    fn test_validate_address() {
        assert!(validate_address(0x1A).is_ok());
        assert_eq!(
            validate_address(0x00),
            Err(ValidationError::InvalidAddress(0x00))
        );
        assert_eq!(
            validate_address(0x80),
            Err(ValidationError::InvalidAddress(0x80))
        );
    }

    #[test]
    fn test_validate_clock_rate_bounds() {
        assert!(validate_clock_rate(6_000_000).is_ok());
        assert!(validate_clock_rate(27_000_000).is_ok());
        assert!(validate_clock_rate(5_999_999).is_err());
        assert!(validate_clock_rate(54_000_000).is_err());
    }

    #[test]
    fn test_validate_settle_delay_bounds() {
        assert!(validate_settle_delay(5_000).is_ok());
        assert!(validate_settle_delay(10_000).is_ok());
        assert_eq!(
            validate_settle_delay(1_000),
            Err(ValidationError::InvalidSettleDelay(1_000))
        );
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&SensorConfig::default()).is_ok());
    }

    #[test]
    fn test_config_reports_first_bad_field() {
        let config = SensorConfig {
            xclk_rate_hz: 0,
            settle_delay_us: 0,
            ..SensorConfig::default()
        };
        assert_eq!(
            validate_config(&config),
            Err(ValidationError::InvalidClockRate(0))
        );
    }

    #[test]
    fn test_mode_table_is_valid() {
        for mode in supported_modes() {
            assert!(validate_mode(mode).is_ok(), "{mode:?}");
        }
    }

    #[test]
    fn test_zero_timing_mode_is_rejected() {
        let mode = Mode {
            vts: 0,
            ..DEFAULT_MODE
        };
        assert_eq!(
            validate_mode(&mode),
            Err(ValidationError::InvalidMode {
                width: 4056,
                height: 3040
            })
        );
    }
}
