//! Power sequencing.
//!
//! Resources are laid out once, in acquisition order:
//!
//! 1. digital rail (dvdd)
//! 2. analog rail (avdd)
//! 3. I/O rail (dovdd, optional)
//! 4. input clock (xclk)
//! 5. reset line (optional, released)
//! 6. power-down line (optional, released)
//!
//! `power_on` walks the list forward. On a failure the enabled prefix is
//! walked backward, so nothing stays on after a failed `power_on`.
//! `power_off` walks the whole list backward and only touches resources whose
//! enabled flag is set.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{Error as _, OutputPin};
use log::{debug, trace, warn};

use crate::error::{PowerError, ResourceError};
use crate::traits::{ClockSource, PowerResource};

/// Identity of a power resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// Digital core supply.
    DigitalRail,
    /// Analog supply.
    AnalogRail,
    /// Interface I/O supply.
    IoRail,
    /// Sensor input clock.
    Clock,
    /// Reset (XCLR) line.
    ResetLine,
    /// Power-down line.
    PowerDownLine,
}

impl ResourceKind {
    /// Supply or signal name as used by the platform binding.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::DigitalRail => "dvdd",
            Self::AnalogRail => "avdd",
            Self::IoRail => "dovdd",
            Self::Clock => "xclk",
            Self::ResetLine => "reset",
            Self::PowerDownLine => "pwdn",
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Electrical level at which a control line is asserted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveLevel {
    /// Asserted when driven high.
    High,
    /// Asserted when driven low.
    Low,
}

/// A reset or power-down GPIO line as a power resource.
///
/// Enabling the resource deasserts the line (lets the sensor run);
/// disabling asserts it.
#[derive(Debug)]
pub struct OutputLine<P> {
    pin: P,
    active: ActiveLevel,
}

impl<P: OutputPin> OutputLine<P> {
    /// Line asserted when driven high.
    pub const fn active_high(pin: P) -> Self {
        Self {
            pin,
            active: ActiveLevel::High,
        }
    }

    /// Line asserted when driven low.
    pub const fn active_low(pin: P) -> Self {
        Self {
            pin,
            active: ActiveLevel::Low,
        }
    }

    fn drive(&mut self, asserted: bool) -> Result<(), ResourceError> {
        let high = asserted == (self.active == ActiveLevel::High);
        let result = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|err| ResourceError::Line(err.kind()))
    }
}

impl<P: OutputPin> PowerResource for OutputLine<P> {
    fn enable(&mut self) -> Result<(), ResourceError> {
        self.drive(false)
    }

    fn disable(&mut self) -> Result<(), ResourceError> {
        self.drive(true)
    }
}

type BoxedResource = Box<dyn PowerResource + Send>;
type BoxedClock = Box<dyn ClockSource + Send>;

/// The platform's power resources for one sensor.
pub struct PowerResourceSet {
    dvdd: BoxedResource,
    avdd: BoxedResource,
    dovdd: Option<BoxedResource>,
    xclk: BoxedClock,
    reset: Option<BoxedResource>,
    pwdn: Option<BoxedResource>,
}

impl PowerResourceSet {
    /// The mandatory resources: both core rails and the clock.
    pub fn new<R1, R2, C>(dvdd: R1, avdd: R2, xclk: C) -> Self
    where
        R1: PowerResource + Send + 'static,
        R2: PowerResource + Send + 'static,
        C: ClockSource + Send + 'static,
    {
        Self {
            dvdd: Box::new(dvdd),
            avdd: Box::new(avdd),
            dovdd: None,
            xclk: Box::new(xclk),
            reset: None,
            pwdn: None,
        }
    }

    /// Add the interface I/O rail.
    #[must_use]
    pub fn with_io_rail<R: PowerResource + Send + 'static>(mut self, dovdd: R) -> Self {
        self.dovdd = Some(Box::new(dovdd));
        self
    }

    /// Add the reset line.
    #[must_use]
    pub fn with_reset_line<R: PowerResource + Send + 'static>(mut self, reset: R) -> Self {
        self.reset = Some(Box::new(reset));
        self
    }

    /// Add the power-down line.
    #[must_use]
    pub fn with_power_down_line<R: PowerResource + Send + 'static>(mut self, pwdn: R) -> Self {
        self.pwdn = Some(Box::new(pwdn));
        self
    }
}

/// Timing parameters of the sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerTiming {
    /// Input clock rate programmed before the first enable.
    pub xclk_rate_hz: u32,
    /// Wait after the last resource comes up.
    pub settle_delay_us: u32,
}

impl Default for PowerTiming {
    fn default() -> Self {
        Self {
            xclk_rate_hz: 24_000_000,
            settle_delay_us: 5_000,
        }
    }
}

/// Clock handle seen through its on/off interface.
struct ClockStep(BoxedClock);

impl PowerResource for ClockStep {
    fn enable(&mut self) -> Result<(), ResourceError> {
        self.0.enable()
    }

    fn disable(&mut self) -> Result<(), ResourceError> {
        self.0.disable()
    }
}

struct PowerStep {
    kind: ResourceKind,
    resource: BoxedResource,
    enabled: bool,
}

impl PowerStep {
    fn new(kind: ResourceKind, resource: BoxedResource) -> Self {
        Self {
            kind,
            resource,
            enabled: false,
        }
    }

    /// Disable if enabled. Failures are logged; the flag is cleared anyway so
    /// the resource is never disabled twice.
    fn release(&mut self) {
        if !self.enabled {
            return;
        }
        self.enabled = false;
        match self.resource.disable() {
            Ok(()) => trace!("{} disabled", self.kind),
            Err(err) => warn!("failed to disable {}: {err}", self.kind),
        }
    }
}

/// Drives the sensor's power resources between fully off and fully on.
pub struct PowerSequencer<D> {
    steps: Vec<PowerStep>,
    delay: D,
    settle_delay_us: u32,
}

impl<D: DelayNs> PowerSequencer<D> {
    /// Program the clock rate and lay out the acquisition order.
    pub fn new(
        resources: PowerResourceSet,
        delay: D,
        timing: PowerTiming,
    ) -> Result<Self, PowerError> {
        let PowerResourceSet {
            dvdd,
            avdd,
            dovdd,
            mut xclk,
            reset,
            pwdn,
        } = resources;

        xclk.set_rate(timing.xclk_rate_hz)
            .map_err(|source| PowerError::ClockRate {
                rate_hz: timing.xclk_rate_hz,
                source,
            })?;

        let mut steps = vec![
            PowerStep::new(ResourceKind::DigitalRail, dvdd),
            PowerStep::new(ResourceKind::AnalogRail, avdd),
        ];
        if let Some(dovdd) = dovdd {
            steps.push(PowerStep::new(ResourceKind::IoRail, dovdd));
        }
        steps.push(PowerStep::new(ResourceKind::Clock, Box::new(ClockStep(xclk))));
        if let Some(reset) = reset {
            steps.push(PowerStep::new(ResourceKind::ResetLine, reset));
        }
        if let Some(pwdn) = pwdn {
            steps.push(PowerStep::new(ResourceKind::PowerDownLine, pwdn));
        }

        Ok(Self {
            steps,
            delay,
            settle_delay_us: timing.settle_delay_us,
        })
    }

    /// Enable every resource in order, then wait for the supplies and clock
    /// to settle.
    pub fn power_on(&mut self) -> Result<(), PowerError> {
        if self.is_powered() {
            return Ok(());
        }

        let mut failure = None;
        for (index, step) in self.steps.iter_mut().enumerate() {
            if step.enabled {
                continue;
            }
            match step.resource.enable() {
                Ok(()) => {
                    step.enabled = true;
                    trace!("{} enabled", step.kind);
                }
                Err(source) => {
                    failure = Some((index, step.kind, source));
                    break;
                }
            }
        }

        if let Some((index, resource, source)) = failure {
            warn!("failed to enable {resource}: {source}, rolling back");
            self.release_prefix(index);
            return Err(PowerError::Enable { resource, source });
        }

        self.delay.delay_us(self.settle_delay_us);
        debug!("sensor powered on");
        Ok(())
    }

    /// Disable every enabled resource in reverse order. Never fails.
    pub fn power_off(&mut self) {
        self.release_prefix(self.steps.len());
        debug!("sensor powered off");
    }

    fn release_prefix(&mut self, end: usize) {
        for step in self.steps.iter_mut().take(end).rev() {
            step.release();
        }
    }

    /// Whether every resource is enabled.
    pub fn is_powered(&self) -> bool {
        self.steps.iter().all(|step| step.enabled)
    }

    /// Whether no resource is enabled.
    pub fn is_off(&self) -> bool {
        self.steps.iter().all(|step| !step.enabled)
    }

    /// Whether `kind` is present and enabled.
    pub fn is_enabled(&self, kind: ResourceKind) -> bool {
        self.steps
            .iter()
            .any(|step| step.kind == kind && step.enabled)
    }

    /// Enabled resources in acquisition order.
    pub fn enabled_resources(&self) -> Vec<ResourceKind> {
        self.steps
            .iter()
            .filter(|step| step.enabled)
            .map(|step| step.kind)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDelay, MockHardware, PowerEvent};

    fn sequencer(hw: &MockHardware) -> PowerSequencer<MockDelay> {
        PowerSequencer::new(hw.resources(), hw.delay.clone(), PowerTiming::default())
            .expect("sequencer should build")
    }

    #[test]
    fn test_power_on_order_and_settle() {
        let hw = MockHardware::new();
        let mut power = sequencer(&hw);
        hw.power_log.clear();

        power.power_on().expect("power_on should succeed");

        assert_eq!(
            hw.power_log.events(),
            vec![
                PowerEvent::Enabled("dvdd"),
                PowerEvent::Enabled("avdd"),
                PowerEvent::Enabled("dovdd"),
                PowerEvent::Enabled("xclk"),
                PowerEvent::Level("reset", true),
                PowerEvent::Level("pwdn", false),
            ]
        );
        assert!(power.is_powered());
        assert_eq!(hw.delay.total_us(), 5_000);
    }

    #[test]
    fn test_clock_rate_set_before_enable() {
        let hw = MockHardware::new();
        let _power = sequencer(&hw);

        assert_eq!(
            hw.power_log.events(),
            vec![PowerEvent::RateSet("xclk", 24_000_000)]
        );
    }

    #[test]
    fn test_clock_rate_failure() {
        let hw = MockHardware::new();
        hw.xclk.fail_set_rate();

        let err = PowerSequencer::new(hw.resources(), hw.delay.clone(), PowerTiming::default())
            .err()
            .expect("rate failure should surface");
        assert!(matches!(
            err,
            PowerError::ClockRate {
                rate_hz: 24_000_000,
                ..
            }
        ));
    }

    #[test]
    fn test_rollback_for_each_failing_step() {
        let order = [
            ResourceKind::DigitalRail,
            ResourceKind::AnalogRail,
            ResourceKind::IoRail,
            ResourceKind::Clock,
        ];

        for (k, failing) in order.iter().enumerate() {
            let hw = MockHardware::new();
            hw.rail(*failing).expect("rail or clock").fail_enable();
            let mut power = sequencer(&hw);
            hw.power_log.clear();

            let err = power.power_on().expect_err("power_on should fail");
            assert_eq!(
                err,
                PowerError::Enable {
                    resource: *failing,
                    source: ResourceError::Fault(-5),
                }
            );

            for kind in order {
                assert!(
                    !hw.rail(kind).expect("rail or clock").is_enabled(),
                    "{kind} left enabled after failure at step {}",
                    k + 1
                );
            }
            assert!(power.is_off());
            assert_eq!(hw.delay.total_us(), 0);

            let disabled: Vec<_> = hw
                .power_log
                .events()
                .into_iter()
                .filter_map(|event| match event {
                    PowerEvent::Disabled(name) => Some(name),
                    _ => None,
                })
                .collect();
            let expected: Vec<_> = order
                .iter()
                .take(k)
                .rev()
                .map(|kind| kind.name())
                .collect();
            assert_eq!(disabled, expected, "rollback order for step {}", k + 1);
        }
    }

    #[test]
    fn test_line_failure_rolls_back_rails_and_clock() {
        let hw = MockHardware::new();
        hw.pwdn.fail();
        let mut power = sequencer(&hw);

        let err = power.power_on().expect_err("power_on should fail");

        assert!(matches!(
            err,
            PowerError::Enable {
                resource: ResourceKind::PowerDownLine,
                source: ResourceError::Line(_),
            }
        ));
        assert!(power.is_off());
        assert_eq!(hw.reset.level(), Some(false));
    }

    #[test]
    fn test_power_off_reverse_order() {
        let hw = MockHardware::new();
        let mut power = sequencer(&hw);
        power.power_on().expect("power_on should succeed");
        hw.power_log.clear();

        power.power_off();

        assert_eq!(
            hw.power_log.events(),
            vec![
                PowerEvent::Level("pwdn", true),
                PowerEvent::Level("reset", false),
                PowerEvent::Disabled("xclk"),
                PowerEvent::Disabled("dovdd"),
                PowerEvent::Disabled("avdd"),
                PowerEvent::Disabled("dvdd"),
            ]
        );
        assert!(power.is_off());
    }

    #[test]
    fn test_power_off_twice_disables_once() {
        let hw = MockHardware::new();
        let mut power = sequencer(&hw);
        power.power_on().expect("power_on should succeed");
        hw.power_log.clear();

        power.power_off();
        power.power_off();

        let events = hw.power_log.events();
        assert_eq!(events.len(), 6, "{events:?}");
        for name in ["dvdd", "avdd", "dovdd", "xclk"] {
            assert_eq!(hw.power_log.disable_count(name), 1, "{name}");
        }
    }

    #[test]
    fn test_power_off_when_never_enabled() {
        let hw = MockHardware::new();
        let mut power = sequencer(&hw);
        hw.power_log.clear();

        power.power_off();

        assert_eq!(hw.power_log.events(), vec![]);
    }

    #[test]
    fn test_power_off_swallows_disable_failure() {
        let hw = MockHardware::new();
        hw.avdd.fail_disable();
        let mut power = sequencer(&hw);
        power.power_on().expect("power_on should succeed");

        power.power_off();

        assert!(power.is_off());
        assert!(!hw.dvdd.is_enabled());
        assert_eq!(hw.power_log.disable_count("dvdd"), 1);
    }

    #[test]
    fn test_lines_driven_to_released_levels() {
        let hw = MockHardware::new();
        let mut power = sequencer(&hw);

        power.power_on().expect("power_on should succeed");
        // reset is active low, pwdn active high
        assert_eq!(hw.reset.level(), Some(true));
        assert_eq!(hw.pwdn.level(), Some(false));

        power.power_off();
        assert_eq!(hw.reset.level(), Some(false));
        assert_eq!(hw.pwdn.level(), Some(true));
    }

    #[test]
    fn test_optional_resources_absent() {
        let hw = MockHardware::new();
        let resources = PowerResourceSet::new(hw.dvdd.clone(), hw.avdd.clone(), hw.xclk.clone());
        let mut power = PowerSequencer::new(resources, hw.delay.clone(), PowerTiming::default())
            .expect("sequencer should build");

        power.power_on().expect("power_on should succeed");

        assert_eq!(
            power.enabled_resources(),
            vec![
                ResourceKind::DigitalRail,
                ResourceKind::AnalogRail,
                ResourceKind::Clock
            ]
        );
        assert!(!power.is_enabled(ResourceKind::IoRail));
        assert!(!hw.dovdd.is_enabled());
    }
}
