//! User-settable controls and their register encoding.

use crate::registers::{RegWrite, EXPOSURE_H, EXPOSURE_L, GAIN_H, GAIN_L};

/// Controls the sensor exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlId {
    /// Analogue gain, 11 bits.
    AnalogueGain,
    /// Coarse integration time in lines, 16 bits.
    Exposure,
}

/// Declared numeric range of a control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRange {
    /// Lowest accepted value.
    pub min: i32,
    /// Highest accepted value.
    pub max: i32,
    /// Step between accepted values.
    pub step: i32,
    /// Value after construction.
    pub default: i32,
}

impl ControlRange {
    /// Whether `value` lies within the range.
    #[must_use]
    pub const fn contains(&self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }
}

impl ControlId {
    /// Every control, in replay order.
    pub const ALL: [Self; 2] = [Self::AnalogueGain, Self::Exposure];

    /// The control's declared range.
    #[must_use]
    pub const fn range(self) -> ControlRange {
        match self {
            Self::AnalogueGain => ControlRange {
                min: 0,
                max: 0x7A5,
                step: 1,
                default: 0,
            },
            Self::Exposure => ControlRange {
                min: 1,
                max: 0xFFFF,
                step: 1,
                default: 0x03E8,
            },
        }
    }

    /// High and low register of the control.
    #[must_use]
    pub const fn registers(self) -> (u16, u16) {
        match self {
            Self::AnalogueGain => (GAIN_H, GAIN_L),
            Self::Exposure => (EXPOSURE_H, EXPOSURE_L),
        }
    }

    /// Mask applied to the high register.
    const fn high_mask(self) -> u8 {
        match self {
            Self::AnalogueGain => 0x07,
            Self::Exposure => 0xFF,
        }
    }

    /// Encode `value` into its two registers, high register first.
    ///
    /// The value is clamped to the declared range first.
    #[must_use]
    pub fn encode(self, value: i32) -> [RegWrite; 2] {
        let range = self.range();
        // Every declared range lies within 0..=0xFFFF.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let raw = value.clamp(range.min, range.max) as u16;
        let [hi, lo] = raw.to_be_bytes();
        let (high, low) = self.registers();
        [
            RegWrite::new(high, hi & self.high_mask()),
            RegWrite::new(low, lo),
        ]
    }

    /// Decode the value held by the control's two registers.
    #[must_use]
    pub fn decode(self, high: u8, low: u8) -> i32 {
        i32::from(u16::from_be_bytes([high & self.high_mask(), low]))
    }
}

impl std::fmt::Display for ControlId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AnalogueGain => write!(f, "analogue_gain"),
            Self::Exposure => write!(f, "exposure"),
        }
    }
}

/// Last accepted value of every control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlValues {
    gain: i32,
    exposure: i32,
}

impl Default for ControlValues {
    fn default() -> Self {
        Self {
            gain: ControlId::AnalogueGain.range().default,
            exposure: ControlId::Exposure.range().default,
        }
    }
}

impl ControlValues {
    /// Stored value of `id`.
    #[must_use]
    pub const fn get(&self, id: ControlId) -> i32 {
        match id {
            ControlId::AnalogueGain => self.gain,
            ControlId::Exposure => self.exposure,
        }
    }

    /// Store `value` for `id`.
    pub fn set(&mut self, id: ControlId, value: i32) {
        match id {
            ControlId::AnalogueGain => self.gain = value,
            ControlId::Exposure => self.exposure = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gain_round_trip_over_full_range() {
        let range = ControlId::AnalogueGain.range();
        for value in range.min..=range.max {
            let [high, low] = ControlId::AnalogueGain.encode(value);
            assert_eq!(
                ControlId::AnalogueGain.decode(high.value, low.value),
                value,
                "gain {value:#x}"
            );
        }
    }

    #[test]
    fn test_gain_high_register_carries_three_bits() {
        let [high, low] = ControlId::AnalogueGain.encode(0x7A5);
        assert_eq!(high, RegWrite::new(GAIN_H, 0x07));
        assert_eq!(low, RegWrite::new(GAIN_L, 0xA5));
    }

    #[test]
    fn test_exposure_encoding() {
        let [high, low] = ControlId::Exposure.encode(0x0100);
        assert_eq!(high, RegWrite::new(EXPOSURE_H, 0x01));
        assert_eq!(low, RegWrite::new(EXPOSURE_L, 0x00));
    }

    #[test]
    fn test_encode_clamps_to_range() {
        let [high, low] = ControlId::Exposure.encode(0);
        assert_eq!(ControlId::Exposure.decode(high.value, low.value), 1);

        let [high, low] = ControlId::AnalogueGain.encode(0x7FF);
        assert_eq!(ControlId::AnalogueGain.decode(high.value, low.value), 0x7A5);
    }

    #[test]
    fn test_ranges() {
        assert!(ControlId::AnalogueGain.range().contains(0));
        assert!(!ControlId::AnalogueGain.range().contains(0x7A6));
        assert!(!ControlId::Exposure.range().contains(0));
        assert!(ControlId::Exposure.range().contains(0xFFFF));
        assert!(!ControlId::Exposure.range().contains(0x1_0000));
    }

    #[test]
    fn test_default_values() {
        let values = ControlValues::default();
        assert_eq!(values.get(ControlId::AnalogueGain), 0);
        assert_eq!(values.get(ControlId::Exposure), 0x03E8);
    }
}
