//! IMX377: control core for the Sony IMX377 CMOS image sensor
//!
//! This library sequences the sensor's power resources, programs its
//! registers over a 16-bit-address register bus, and exposes the streaming
//! state machine and the gain/exposure controls. Hardware access goes through
//! `embedded-hal` and the traits in [`traits`], so the same driver runs on a
//! real board or against the simulated hardware in [`mock`].

pub mod config;
pub mod control;
pub mod device;
pub mod error;
pub mod mock;
pub mod mode;
pub mod power;
pub mod registers;
pub mod traits;
pub mod transport;
pub mod validation;

pub use config::SensorConfig;
pub use control::{ControlId, ControlRange, ControlValues};
pub use device::{Imx377, StreamState};
pub use error::{ConfigError, DriverError, PowerError, ResourceError, Result, TransportError};
pub use mode::{nearest_mode, supported_modes, FormatHint, Mode, PixelCode, DEFAULT_MODE};
pub use power::{OutputLine, PowerResourceSet, PowerSequencer, PowerTiming, ResourceKind};
pub use registers::RegWrite;
pub use traits::{ClockSource, FourCC, PowerResource, RegisterBus};
pub use transport::{I2cBus, RegisterTransport};
pub use validation::ValidationError;
