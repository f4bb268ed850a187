//! IMX377 register map.
//!
//! Addresses are 16 bits wide, values 8 bits. Multi-byte quantities are split
//! across consecutive registers, high byte first.

// =============================================================================
// Bus
// =============================================================================

/// Default 7-bit I2C address of the sensor.
pub const IMX377_ADDR: u8 = 0x1A;

// =============================================================================
// Operating mode
// =============================================================================

/// Standby control. Written to 0x00 before streaming starts.
pub const STANDBY: u16 = 0x3000;

/// Leave standby.
pub const STANDBY_RELEASE: u8 = 0x00;

/// Mode select: gates pixel output.
pub const MODE_SELECT: u16 = 0x0100;

/// Mode select value: standby, no pixel output.
pub const MODE_STANDBY: u8 = 0x00;

/// Mode select value: streaming.
pub const MODE_STREAMING: u8 = 0x01;

// =============================================================================
// Controls
// =============================================================================

/// Analogue gain, bits 10..8.
pub const GAIN_H: u16 = 0x3009;

/// Analogue gain, bits 7..0.
pub const GAIN_L: u16 = 0x300A;

/// Coarse integration time, bits 15..8.
pub const EXPOSURE_H: u16 = 0x300B;

/// Coarse integration time, bits 7..0.
pub const EXPOSURE_L: u16 = 0x300C;

// =============================================================================
// Timing
// =============================================================================

/// Line length (HMAX), bits 15..8.
pub const HMAX_H: u16 = 0x30F5;

/// Line length (HMAX), bits 7..0.
pub const HMAX_L: u16 = 0x30F6;

/// Frame length (VMAX), bits 15..8.
pub const VMAX_H: u16 = 0x30F7;

/// Frame length (VMAX), bits 7..0.
pub const VMAX_L: u16 = 0x30F8;

/// A single register write in a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegWrite {
    /// Register address.
    pub address: u16,
    /// Value to store.
    pub value: u8,
}

impl RegWrite {
    /// Create a register write.
    #[must_use]
    pub const fn new(address: u16, value: u8) -> Self {
        Self { address, value }
    }
}

/// Split a 16-bit quantity across a high/low register pair.
#[must_use]
pub const fn split_u16(high: u16, low: u16, value: u16) -> [RegWrite; 2] {
    let [hi, lo] = value.to_be_bytes();
    [RegWrite::new(high, hi), RegWrite::new(low, lo)]
}
