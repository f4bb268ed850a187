//! Mode descriptor table and format negotiation.
//!
//! Modes are statically defined and selected by reference; nothing here
//! touches the bus.

use crate::registers::{split_u16, RegWrite, HMAX_H, HMAX_L, VMAX_H, VMAX_L};
use crate::traits::FourCC;

/// Link frequencies the sensor's CSI-2 output supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkFrequency {
    /// 576 MHz.
    Mhz576,
}

impl LinkFrequency {
    /// Frequency in Hz.
    #[must_use]
    pub const fn hz(self) -> u64 {
        match self {
            Self::Mhz576 => 576_000_000,
        }
    }
}

/// Pixel encodings the sensor can output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelCode {
    /// 12-bit Bayer RGGB.
    Srggb12,
}

impl PixelCode {
    /// Media bus format code (`MEDIA_BUS_FMT_SRGGB12_1X12`).
    #[must_use]
    pub const fn media_bus_code(self) -> u32 {
        match self {
            Self::Srggb12 => 0x3012,
        }
    }

    /// FourCC of the matching memory format.
    #[must_use]
    pub const fn fourcc(self) -> FourCC {
        match self {
            Self::Srggb12 => FourCC::RG12,
        }
    }

    /// Pixel code for a FourCC, if the sensor can produce it.
    #[must_use]
    pub fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        (fourcc == FourCC::RG12).then_some(Self::Srggb12)
    }
}

/// Immutable sensor mode descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    /// Active width in pixels.
    pub width: u32,
    /// Active height in pixels.
    pub height: u32,
    /// Pixel encoding.
    pub code: PixelCode,
    /// Line length in pixel clocks (HMAX).
    pub hts: u16,
    /// Frame length in lines (VMAX).
    pub vts: u16,
    /// CSI-2 link frequency.
    pub link_freq: LinkFrequency,
}

impl Mode {
    /// Register writes programming the mode's line and frame length.
    #[must_use]
    pub const fn timing_registers(&self) -> [RegWrite; 4] {
        let [hmax_h, hmax_l] = split_u16(HMAX_H, HMAX_L, self.hts);
        let [vmax_h, vmax_l] = split_u16(VMAX_H, VMAX_L, self.vts);
        [hmax_h, hmax_l, vmax_h, vmax_l]
    }
}

/// Full-resolution 4056x3040 12-bit readout.
pub const DEFAULT_MODE: Mode = Mode {
    width: 4056,
    height: 3040,
    code: PixelCode::Srggb12,
    hts: 0x0172,
    vts: 0x0CB2,
    link_freq: LinkFrequency::Mhz576,
};

/// Every supported mode.
static MODES: &[Mode] = &[DEFAULT_MODE];

/// Supported modes, for code and frame size enumeration.
#[must_use]
pub fn supported_modes() -> &'static [Mode] {
    MODES
}

/// Requested format passed in by format negotiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatHint {
    /// Requested width in pixels.
    pub width: u32,
    /// Requested height in pixels.
    pub height: u32,
    /// Requested pixel code, if any.
    pub code: Option<PixelCode>,
}

impl FormatHint {
    /// Hint for a geometry with any pixel code.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            code: None,
        }
    }

    /// Restrict the hint to `code`.
    #[must_use]
    pub const fn with_code(mut self, code: PixelCode) -> Self {
        self.code = Some(code);
        self
    }
}

#[cfg(feature = "v4l")]
impl From<&v4l::Format> for FormatHint {
    fn from(format: &v4l::Format) -> Self {
        Self {
            width: format.width,
            height: format.height,
            code: PixelCode::from_fourcc(FourCC::from(format.fourcc)),
        }
    }
}

/// Pick the mode closest to `hint`.
///
/// Modes with the requested pixel code win over others, then the smallest
/// combined width and height distance.
#[must_use]
pub fn nearest_mode(hint: &FormatHint) -> &'static Mode {
    MODES
        .iter()
        .min_by_key(|mode| {
            let code_mismatch = hint.code.is_some_and(|code| code != mode.code);
            let distance = u64::from(mode.width.abs_diff(hint.width))
                + u64::from(mode.height.abs_diff(hint.height));
            (code_mismatch, distance)
        })
        .unwrap_or(&DEFAULT_MODE)
}
