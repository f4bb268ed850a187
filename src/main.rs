//! imx377-dry-run: drives one sensor lifecycle against simulated hardware and
//! prints the resulting register and power traffic.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use imx377_sensor::mock::MockHardware;
use imx377_sensor::{ControlId, FormatHint, Imx377, SensorConfig};

#[derive(Debug, Parser)]
#[command(name = "imx377-dry-run", about = "Simulate an IMX377 stream lifecycle")]
struct Args {
    /// TOML sensor configuration; defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Analogue gain applied while streaming.
    #[arg(long, default_value_t = 0x100)]
    gain: i32,

    /// Exposure in lines applied while streaming.
    #[arg(long, default_value_t = 0x3E8)]
    exposure: i32,

    /// Requested frame width.
    #[arg(long, default_value_t = 4056)]
    width: u32,

    /// Requested frame height.
    #[arg(long, default_value_t = 3040)]
    height: u32,
}

fn main() {
    env_logger::init();

    if let Err(err) = run(&Args::parse()) {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => SensorConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SensorConfig::default(),
    };

    let hw = MockHardware::new();
    let sensor = Imx377::new(hw.bus.clone(), hw.resources(), hw.delay.clone(), &config)?;

    let mode = sensor.set_format(&FormatHint::new(args.width, args.height));
    println!(
        "Mode: {}x{} {} (hts {:#06x}, vts {:#06x})",
        mode.width,
        mode.height,
        mode.code.fourcc(),
        mode.hts,
        mode.vts
    );

    sensor
        .set_control(ControlId::AnalogueGain, args.gain)
        .context("setting gain")?;
    sensor.start_streaming().context("starting stream")?;
    sensor
        .set_control(ControlId::Exposure, args.exposure)
        .context("setting exposure")?;
    sensor.shutdown().context("stopping stream")?;

    println!("Power events:");
    for event in hw.power_log.events() {
        println!("  {event:?}");
    }
    println!("Register writes:");
    for reg in hw.bus.writes() {
        println!("  {:#06x} <- {:#04x}", reg.address, reg.value);
    }
    println!("Settle time: {} us", hw.delay.total_us());
    Ok(())
}
