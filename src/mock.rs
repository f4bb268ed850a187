//! Simulated hardware for testing and dry runs without a sensor.
//!
//! Every mock is a cheap handle over shared state: clone one, hand the clone
//! to the driver, and inspect the handle you kept afterwards.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorType, OutputPin};
use embedded_hal::i2c::ErrorKind;
use parking_lot::Mutex;

use crate::error::ResourceError;
use crate::power::{OutputLine, PowerResourceSet, ResourceKind};
use crate::registers::RegWrite;
use crate::traits::{ClockSource, PowerResource, RegisterBus};

/// Error code returned by failing mock resources (`-EIO`).
pub const MOCK_FAULT_CODE: i32 = -5;

/// A transaction seen by [`MockBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusTransaction {
    /// Plain write.
    Write {
        /// Bytes sent.
        bytes: Vec<u8>,
    },
    /// Combined write then read.
    WriteRead {
        /// Bytes sent.
        out: Vec<u8>,
        /// Bytes requested.
        read_len: usize,
    },
}

/// Fault injected for a register address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusFault {
    /// Fail the transaction with a bus error.
    Bus(ErrorKind),
    /// Report only this many bytes moved.
    Short(usize),
}

#[derive(Debug, Default)]
struct BusState {
    transactions: Vec<BusTransaction>,
    registers: HashMap<u16, u8>,
    faults: HashMap<u16, BusFault>,
}

/// Recording register bus backed by a register file.
#[derive(Debug, Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<BusState>>,
}

impl MockBus {
    /// Create an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every transaction addressing `address` fail with `fault`.
    pub fn inject_fault(&self, address: u16, fault: BusFault) {
        self.state.lock().faults.insert(address, fault);
    }

    /// Remove the fault injected for `address`.
    pub fn clear_fault(&self, address: u16) {
        self.state.lock().faults.remove(&address);
    }

    /// Preset a register value returned by reads.
    pub fn set_register(&self, address: u16, value: u8) {
        self.state.lock().registers.insert(address, value);
    }

    /// Last value written to `address`.
    #[must_use]
    pub fn register(&self, address: u16) -> Option<u8> {
        self.state.lock().registers.get(&address).copied()
    }

    /// All transactions so far.
    #[must_use]
    pub fn transactions(&self) -> Vec<BusTransaction> {
        self.state.lock().transactions.clone()
    }

    /// Register writes so far, decoded from the write transactions.
    #[must_use]
    pub fn writes(&self) -> Vec<RegWrite> {
        self.state
            .lock()
            .transactions
            .iter()
            .filter_map(|transaction| match transaction {
                BusTransaction::Write { bytes } => match bytes.as_slice() {
                    [hi, lo, value] => Some(RegWrite::new(u16::from_be_bytes([*hi, *lo]), *value)),
                    _ => None,
                },
                BusTransaction::WriteRead { .. } => None,
            })
            .collect()
    }

    /// Forget recorded transactions.
    pub fn clear_transactions(&self) {
        self.state.lock().transactions.clear();
    }
}

fn frame_address(bytes: &[u8]) -> Option<u16> {
    match bytes {
        [hi, lo, ..] => Some(u16::from_be_bytes([*hi, *lo])),
        _ => None,
    }
}

impl RegisterBus for MockBus {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, ErrorKind> {
        let mut state = self.state.lock();
        state.transactions.push(BusTransaction::Write {
            bytes: bytes.to_vec(),
        });

        let address = frame_address(bytes);
        match address.and_then(|address| state.faults.get(&address).copied()) {
            Some(BusFault::Bus(kind)) => return Err(kind),
            Some(BusFault::Short(moved)) => return Ok(moved.min(bytes.len())),
            None => {}
        }

        if let (Some(address), [_, _, value]) = (address, bytes) {
            state.registers.insert(address, *value);
        }
        Ok(bytes.len())
    }

    fn write_read(&mut self, out: &[u8], input: &mut [u8]) -> Result<usize, ErrorKind> {
        let mut state = self.state.lock();
        state.transactions.push(BusTransaction::WriteRead {
            out: out.to_vec(),
            read_len: input.len(),
        });

        let address = frame_address(out);
        match address.and_then(|address| state.faults.get(&address).copied()) {
            Some(BusFault::Bus(kind)) => return Err(kind),
            Some(BusFault::Short(moved)) => return Ok(moved.min(input.len())),
            None => {}
        }

        let value = address
            .and_then(|address| state.registers.get(&address).copied())
            .unwrap_or_default();
        input.fill(value);
        Ok(input.len())
    }
}

/// Something that happened to a mock power resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    /// Rail or clock enabled.
    Enabled(&'static str),
    /// Rail or clock disabled.
    Disabled(&'static str),
    /// Clock rate programmed.
    RateSet(&'static str, u32),
    /// GPIO line driven to a level (`true` = high).
    Level(&'static str, bool),
}

/// Ordered event log shared by mock power resources.
#[derive(Debug, Clone, Default)]
pub struct PowerLog {
    events: Arc<Mutex<Vec<PowerEvent>>>,
}

impl PowerLog {
    /// Create an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: PowerEvent) {
        self.events.lock().push(event);
    }

    /// All events so far.
    #[must_use]
    pub fn events(&self) -> Vec<PowerEvent> {
        self.events.lock().clone()
    }

    /// Forget recorded events.
    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// How often `name` was disabled.
    #[must_use]
    pub fn disable_count(&self, name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| matches!(event, PowerEvent::Disabled(n) if *n == name))
            .count()
    }
}

#[derive(Debug, Default)]
struct ResourceState {
    enabled: bool,
    fail_enable: bool,
    fail_disable: bool,
    fail_set_rate: bool,
    rate_hz: Option<u32>,
}

/// Mock rail or clock.
#[derive(Debug, Clone)]
pub struct MockResource {
    name: &'static str,
    log: PowerLog,
    state: Arc<Mutex<ResourceState>>,
}

impl MockResource {
    /// Create a resource reporting to `log`.
    #[must_use]
    pub fn new(name: &'static str, log: &PowerLog) -> Self {
        Self {
            name,
            log: log.clone(),
            state: Arc::default(),
        }
    }

    /// Make `enable` fail.
    pub fn fail_enable(&self) {
        self.state.lock().fail_enable = true;
    }

    /// Make `disable` fail.
    pub fn fail_disable(&self) {
        self.state.lock().fail_disable = true;
    }

    /// Make `set_rate` fail.
    pub fn fail_set_rate(&self) {
        self.state.lock().fail_set_rate = true;
    }

    /// Whether the resource is currently on.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Last programmed clock rate.
    #[must_use]
    pub fn rate_hz(&self) -> Option<u32> {
        self.state.lock().rate_hz
    }
}

impl PowerResource for MockResource {
    fn enable(&mut self) -> Result<(), ResourceError> {
        let mut state = self.state.lock();
        if state.fail_enable {
            return Err(ResourceError::Fault(MOCK_FAULT_CODE));
        }
        state.enabled = true;
        self.log.push(PowerEvent::Enabled(self.name));
        Ok(())
    }

    fn disable(&mut self) -> Result<(), ResourceError> {
        let mut state = self.state.lock();
        if state.fail_disable {
            return Err(ResourceError::Fault(MOCK_FAULT_CODE));
        }
        state.enabled = false;
        self.log.push(PowerEvent::Disabled(self.name));
        Ok(())
    }
}

impl ClockSource for MockResource {
    fn set_rate(&mut self, rate_hz: u32) -> Result<(), ResourceError> {
        let mut state = self.state.lock();
        if state.fail_set_rate {
            return Err(ResourceError::Unavailable);
        }
        state.rate_hz = Some(rate_hz);
        self.log.push(PowerEvent::RateSet(self.name, rate_hz));
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PinState {
    level: Option<bool>,
    fail: bool,
}

/// Mock GPIO output.
#[derive(Debug, Clone)]
pub struct MockPin {
    name: &'static str,
    log: PowerLog,
    state: Arc<Mutex<PinState>>,
}

impl MockPin {
    /// Create a pin reporting to `log`. The level is unknown until driven.
    #[must_use]
    pub fn new(name: &'static str, log: &PowerLog) -> Self {
        Self {
            name,
            log: log.clone(),
            state: Arc::default(),
        }
    }

    /// Make every level change fail.
    pub fn fail(&self) {
        self.state.lock().fail = true;
    }

    /// Last driven level (`true` = high).
    #[must_use]
    pub fn level(&self) -> Option<bool> {
        self.state.lock().level
    }

    fn drive(&self, high: bool) -> Result<(), digital::ErrorKind> {
        let mut state = self.state.lock();
        if state.fail {
            return Err(digital::ErrorKind::Other);
        }
        state.level = Some(high);
        self.log.push(PowerEvent::Level(self.name, high));
        Ok(())
    }
}

impl ErrorType for MockPin {
    type Error = digital::ErrorKind;
}

impl OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.drive(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.drive(true)
    }
}

/// Delay that only accumulates the requested time.
#[derive(Debug, Clone, Default)]
pub struct MockDelay {
    total_ns: Arc<AtomicU64>,
}

impl MockDelay {
    /// Create a delay with nothing accumulated.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requested delay in microseconds.
    #[must_use]
    pub fn total_us(&self) -> u64 {
        self.total_ns.load(Ordering::Relaxed) / 1_000
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns.fetch_add(u64::from(ns), Ordering::Relaxed);
    }
}

/// A complete simulated sensor board: bus, every power resource, both
/// control lines and a delay, all sharing one power log.
#[derive(Debug, Clone)]
pub struct MockHardware {
    /// Register bus.
    pub bus: MockBus,
    /// Events of every power resource, in order.
    pub power_log: PowerLog,
    /// Digital rail.
    pub dvdd: MockResource,
    /// Analog rail.
    pub avdd: MockResource,
    /// I/O rail.
    pub dovdd: MockResource,
    /// Input clock.
    pub xclk: MockResource,
    /// Reset line (active low).
    pub reset: MockPin,
    /// Power-down line (active high).
    pub pwdn: MockPin,
    /// Settle delay.
    pub delay: MockDelay,
}

impl Default for MockHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHardware {
    /// Create a board with every resource present and working.
    #[must_use]
    pub fn new() -> Self {
        let power_log = PowerLog::new();
        Self {
            bus: MockBus::new(),
            dvdd: MockResource::new("dvdd", &power_log),
            avdd: MockResource::new("avdd", &power_log),
            dovdd: MockResource::new("dovdd", &power_log),
            xclk: MockResource::new("xclk", &power_log),
            reset: MockPin::new("reset", &power_log),
            pwdn: MockPin::new("pwdn", &power_log),
            delay: MockDelay::new(),
            power_log,
        }
    }

    /// Power resource set wired to this board's mocks.
    #[must_use]
    pub fn resources(&self) -> PowerResourceSet {
        PowerResourceSet::new(self.dvdd.clone(), self.avdd.clone(), self.xclk.clone())
            .with_io_rail(self.dovdd.clone())
            .with_reset_line(OutputLine::active_low(self.reset.clone()))
            .with_power_down_line(OutputLine::active_high(self.pwdn.clone()))
    }

    /// Rail or clock mock for `kind`; `None` for the control lines.
    #[must_use]
    pub const fn rail(&self, kind: ResourceKind) -> Option<&MockResource> {
        match kind {
            ResourceKind::DigitalRail => Some(&self.dvdd),
            ResourceKind::AnalogRail => Some(&self.avdd),
            ResourceKind::IoRail => Some(&self.dovdd),
            ResourceKind::Clock => Some(&self.xclk),
            ResourceKind::ResetLine | ResourceKind::PowerDownLine => None,
        }
    }

    /// Whether every rail and the clock are off.
    #[must_use]
    pub fn all_off(&self) -> bool {
        [&self.dvdd, &self.avdd, &self.dovdd, &self.xclk]
            .iter()
            .all(|resource| !resource.is_enabled())
    }
}
