//! IMX377 device instance: streaming state machine, control plane and format
//! negotiation.
//!
//! All mutable state lives behind one lock per device, held for the full
//! duration of every operation, including the power-up settle wait.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::{debug, info, warn};
use parking_lot::Mutex;

use crate::config::SensorConfig;
use crate::control::{ControlId, ControlValues};
use crate::error::{DriverError, Result};
use crate::mode::{nearest_mode, FormatHint, Mode, DEFAULT_MODE};
use crate::power::{PowerResourceSet, PowerSequencer, ResourceKind};
use crate::registers::{
    RegWrite, MODE_SELECT, MODE_STANDBY, MODE_STREAMING, STANDBY, STANDBY_RELEASE,
};
use crate::traits::RegisterBus;
use crate::transport::{I2cBus, RegisterTransport};

/// Externally visible streaming state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Powered off, no mode programmed.
    Idle,
    /// Powered, mode programmed, pixel output enabled.
    Streaming,
}

struct DeviceState<B, D> {
    transport: RegisterTransport<B>,
    power: PowerSequencer<D>,
    mode: &'static Mode,
    stream: StreamState,
    controls: ControlValues,
}

impl<B: RegisterBus, D: DelayNs> DeviceState<B, D> {
    fn write(&mut self, reg: RegWrite) -> Result<()> {
        self.transport
            .write(reg.address, reg.value)
            .map_err(|source| DriverError::Register {
                address: reg.address,
                source,
            })
    }

    /// Register sequence from powered standby to streaming.
    fn program_stream_on(&mut self, replay_controls: bool) -> Result<()> {
        self.write(RegWrite::new(STANDBY, STANDBY_RELEASE))?;
        for reg in self.mode.timing_registers() {
            self.write(reg)?;
        }
        if replay_controls {
            for id in ControlId::ALL {
                for reg in id.encode(self.controls.get(id)) {
                    self.write(reg)?;
                }
            }
        }
        self.write(RegWrite::new(MODE_SELECT, MODE_STREAMING))
    }

    fn start(&mut self, replay_controls: bool) -> Result<()> {
        if self.stream == StreamState::Streaming {
            debug!("already streaming");
            return Ok(());
        }

        self.power.power_on()?;
        if let Err(err) = self.program_stream_on(replay_controls) {
            warn!("stream start failed, powering down: {err}");
            self.stream = StreamState::Idle;
            self.power.power_off();
            return Err(err);
        }

        self.stream = StreamState::Streaming;
        info!(
            "streaming {}x{} ({} Hz link)",
            self.mode.width,
            self.mode.height,
            self.mode.link_freq.hz()
        );
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if self.stream == StreamState::Idle {
            self.power.power_off();
            return Ok(());
        }

        let result = self.write(RegWrite::new(MODE_SELECT, MODE_STANDBY));
        if let Err(err) = &result {
            warn!("stream-off write failed, powering down anyway: {err}");
        }
        self.stream = StreamState::Idle;
        self.power.power_off();
        info!("streaming stopped");
        result
    }
}

/// One IMX377 sensor.
///
/// Constructed `Idle` and unpowered with the default mode selected. Dropping
/// the device stops streaming and powers everything down.
pub struct Imx377<B: RegisterBus, D: DelayNs> {
    state: Mutex<DeviceState<B, D>>,
    replay_controls: bool,
}

impl<B: RegisterBus, D: DelayNs> Imx377<B, D> {
    /// Create the device on top of a register bus.
    ///
    /// Validates `config` and programs the input clock rate; nothing is
    /// powered yet.
    pub fn new(
        bus: B,
        resources: PowerResourceSet,
        delay: D,
        config: &SensorConfig,
    ) -> Result<Self> {
        config.validate()?;
        let power = PowerSequencer::new(resources, delay, config.power_timing())?;

        Ok(Self {
            state: Mutex::new(DeviceState {
                transport: RegisterTransport::new(bus),
                power,
                mode: &DEFAULT_MODE,
                stream: StreamState::Idle,
                controls: ControlValues::default(),
            }),
            replay_controls: config.replay_controls,
        })
    }

    /// Power up and start pixel output with the selected mode.
    ///
    /// On any failure the device ends `Idle` and fully powered down, and the
    /// triggering error is returned.
    pub fn start_streaming(&self) -> Result<()> {
        self.state.lock().start(self.replay_controls)
    }

    /// Stop pixel output and power down.
    ///
    /// The device is powered down even when the stream-off write fails; that
    /// failure is still returned.
    pub fn stop_streaming(&self) -> Result<()> {
        self.state.lock().stop()
    }

    /// Stream on/off entry point of the video operations.
    pub fn set_stream(&self, enable: bool) -> Result<()> {
        if enable {
            self.start_streaming()
        } else {
            self.stop_streaming()
        }
    }

    /// Apply a control value.
    ///
    /// While not streaming the value is only stored. While streaming both
    /// registers are written; if either write fails the first failure is
    /// returned and the stored value is left unchanged.
    pub fn set_control(&self, id: ControlId, value: i32) -> Result<()> {
        let range = id.range();
        if !range.contains(value) {
            return Err(DriverError::ControlOutOfRange {
                id,
                value,
                min: range.min,
                max: range.max,
            });
        }

        let mut state = self.state.lock();
        if state.stream != StreamState::Streaming {
            state.controls.set(id, value);
            debug!("{id} = {value}, deferred until streaming");
            return Ok(());
        }

        let [high, low] = id.encode(value);
        let high_result = state.write(high);
        let low_result = state.write(low);
        high_result.and(low_result)?;

        state.controls.set(id, value);
        debug!("{id} = {value}");
        Ok(())
    }

    /// Stored value of a control.
    #[must_use]
    pub fn control(&self, id: ControlId) -> i32 {
        self.state.lock().controls.get(id)
    }

    /// Currently selected mode.
    #[must_use]
    pub fn get_format(&self) -> Mode {
        *self.state.lock().mode
    }

    /// Select the mode closest to `hint` and return it.
    ///
    /// While streaming the current mode stays selected and is returned.
    pub fn set_format(&self, hint: &FormatHint) -> Mode {
        let mut state = self.state.lock();
        if state.stream == StreamState::Streaming {
            debug!("format change ignored while streaming");
            return *state.mode;
        }
        state.mode = nearest_mode(hint);
        *state.mode
    }

    /// Mode `set_format` would select, without selecting it.
    #[must_use]
    pub fn try_format(&self, hint: &FormatHint) -> Mode {
        let state = self.state.lock();
        if state.stream == StreamState::Streaming {
            return *state.mode;
        }
        *nearest_mode(hint)
    }

    /// Read a register for diagnostics. The sensor must be powered.
    pub fn read_register(&self, address: u16) -> Result<u8> {
        let mut state = self.state.lock();
        if !state.power.is_powered() {
            return Err(DriverError::NotPowered);
        }
        state
            .transport
            .read(address)
            .map_err(|source| DriverError::Register { address, source })
    }

    /// Current streaming state.
    #[must_use]
    pub fn state(&self) -> StreamState {
        self.state.lock().stream
    }

    /// Whether the sensor is streaming.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.state() == StreamState::Streaming
    }

    /// Whether every power resource is on.
    #[must_use]
    pub fn is_powered(&self) -> bool {
        self.state.lock().power.is_powered()
    }

    /// Enabled power resources in acquisition order.
    #[must_use]
    pub fn enabled_resources(&self) -> Vec<ResourceKind> {
        self.state.lock().power.enabled_resources()
    }

    /// Stop streaming and power down, reporting a failed stream-off write.
    pub fn shutdown(self) -> Result<()> {
        self.stop_streaming()
    }
}

impl<I2C: I2c, D: DelayNs> Imx377<I2cBus<I2C>, D> {
    /// Create the device on an `embedded-hal` I2C bus at the configured
    /// address.
    pub fn with_i2c(
        i2c: I2C,
        resources: PowerResourceSet,
        delay: D,
        config: &SensorConfig,
    ) -> Result<Self> {
        Self::new(
            I2cBus::new(i2c, config.i2c_address),
            resources,
            delay,
            config,
        )
    }
}

impl<B: RegisterBus, D: DelayNs> Drop for Imx377<B, D> {
    fn drop(&mut self) {
        if let Err(err) = self.state.get_mut().stop() {
            warn!("teardown: {err}");
        }
    }
}
