//! Error types for every layer of the sensor core.

use embedded_hal::digital;
use embedded_hal::i2c;
use thiserror::Error;

use crate::control::ControlId;
use crate::power::ResourceKind;
use crate::validation::ValidationError;

/// Bus-level failure of a single register transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The bus moved fewer bytes than the transaction needed.
    #[error("short transfer: {actual} of {expected} bytes moved")]
    ShortTransfer {
        /// Bytes the transaction needed to move.
        expected: usize,
        /// Bytes the bus reported as moved.
        actual: usize,
    },
    /// The underlying bus reported a fault.
    #[error("bus fault: {0}")]
    Bus(i2c::ErrorKind),
}

/// Failure reported by a platform power resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// The platform could not provide the resource.
    #[error("resource unavailable")]
    Unavailable,
    /// Platform-specific failure code.
    #[error("platform fault (code {0})")]
    Fault(i32),
    /// A GPIO line could not be driven.
    #[error("line fault: {0}")]
    Line(digital::ErrorKind),
}

/// Power sequencing failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PowerError {
    /// A resource failed to enable; everything enabled before it was rolled back.
    #[error("failed to enable {resource}: {source}")]
    Enable {
        /// The resource that failed.
        resource: ResourceKind,
        /// Platform error.
        #[source]
        source: ResourceError,
    },
    /// The input clock rejected the requested rate.
    #[error("failed to set xclk rate to {rate_hz} Hz: {source}")]
    ClockRate {
        /// Requested rate.
        rate_hz: u32,
        /// Platform error.
        #[source]
        source: ResourceError,
    },
}

/// Errors surfaced by the device-level operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// Power sequencing failed.
    #[error(transparent)]
    Power(#[from] PowerError),
    /// A register transaction failed.
    #[error("register {address:#06x}: {source}")]
    Register {
        /// Register that was being accessed.
        address: u16,
        /// Bus-level cause.
        #[source]
        source: TransportError,
    },
    /// A control value lies outside its declared range.
    #[error("{id} value {value} outside {min}..={max}")]
    ControlOutOfRange {
        /// Control being set.
        id: ControlId,
        /// Rejected value.
        value: i32,
        /// Lowest accepted value.
        min: i32,
        /// Highest accepted value.
        max: i32,
    },
    /// The operation needs register access but the sensor is powered down.
    #[error("sensor is not powered")]
    NotPowered,
    /// The device configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(#[from] ValidationError),
}

/// Errors raised while loading a [`SensorConfig`](crate::config::SensorConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The config file is not valid TOML for this schema.
    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// The config parsed but holds out-of-range values.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ValidationError),
}

/// Result type for device operations.
pub type Result<T> = std::result::Result<T, DriverError>;
