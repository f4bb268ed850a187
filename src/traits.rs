//! Core traits and types at the boundary between the sensor core and the
//! platform that hosts it.

use embedded_hal::i2c::ErrorKind;

use crate::error::ResourceError;

/// Pixel format representation as a V4L2 FourCC (e.g., RG12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC(pub [u8; 4]);

impl FourCC {
    /// Create a new `FourCC` from a 4-byte array.
    #[must_use]
    pub const fn new(code: &[u8; 4]) -> Self {
        Self(*code)
    }

    /// 12-bit Bayer RGGB, one sample per 16-bit word.
    pub const RG12: Self = Self::new(b"RG12");
}

impl std::fmt::Display for FourCC {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in self.0 {
            write!(f, "{}", char::from(byte))?;
        }
        Ok(())
    }
}

#[cfg(feature = "v4l")]
impl From<v4l::FourCC> for FourCC {
    fn from(fourcc: v4l::FourCC) -> Self {
        Self(fourcc.repr)
    }
}

#[cfg(feature = "v4l")]
impl From<FourCC> for v4l::FourCC {
    fn from(fourcc: FourCC) -> Self {
        Self::new(&fourcc.0)
    }
}

/// Addressed request/response bus the register transport rides on.
///
/// Both calls target the sensor's own bus address; the binding supplies it.
/// The returned count is the number of payload bytes actually moved, which
/// may be lower than requested on a short transfer.
pub trait RegisterBus {
    /// Send `bytes` in a single write transaction.
    fn write(&mut self, bytes: &[u8]) -> Result<usize, ErrorKind>;

    /// Send `out`, then read into `input` as one combined transaction.
    ///
    /// Returns the number of bytes received.
    fn write_read(&mut self, out: &[u8], input: &mut [u8]) -> Result<usize, ErrorKind>;
}

/// A power resource the sequencer can switch: a voltage rail, the sensor
/// clock, or a reset/power-down line.
///
/// Calls may block and may fail independently of each other.
pub trait PowerResource {
    /// Bring the resource into its ready state.
    fn enable(&mut self) -> Result<(), ResourceError>;

    /// Return the resource to its off state.
    fn disable(&mut self) -> Result<(), ResourceError>;
}

/// The sensor input clock.
pub trait ClockSource: PowerResource {
    /// Program the clock rate. Called once, before the first enable.
    fn set_rate(&mut self, rate_hz: u32) -> Result<(), ResourceError>;
}
