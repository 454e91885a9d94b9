//! Drive an FY3200S into a 50 Ohm load and a scope input.
//!
//! Demonstrated here:
//!   * Building a driver and connecting to an instrument
//!   * Session logging to a file named after the driver and port
//!   * Per-channel load impedance and the resulting amplitude correction
//!   * Addressing one channel or both at once
//!
//! Runs against the in-memory mockup so that no hardware is needed.

use fyawg::device::{MockupConnector, Target};
use fyawg::logging::init_logging;
use fyawg::*;

fn main() -> Result<(), AwgError> {
    // Keep a handle on the mockup's command log
    let mock = MockupConnector::default();
    let commands = mock.log();

    let mut config = DriverConfig::new("/dev/ttyUSB0", Box::new(mock));
    config.log_dir = Some("./software/fyawg/examples".into());
    if let Some(log_path) = init_logging(&config)? {
        println!("Logging to {log_path:?}");
    }

    let mut awg = Fy3200s::from_config(config)?;
    awg.initialize()?;
    println!("Connected to {}", awg.get_id()?);

    // Channel 1 drives a 50 Ohm termination, channel 2 a scope input
    awg.set_load_impedance(2, LoadImpedance::HighZ)?;

    awg.set_wave_type(0, Waveform::Sine)?;
    awg.set_frequency(0, 1000.0 * 100.0)?; // 1 kHz
    awg.set_amplitude(0, 1.0)?;
    awg.set_offset(1, 0.25)?;
    awg.set_phase(-90.0)?;
    awg.enable_output(0, true)?;

    for ch in 1..=awg.channel_count() {
        println!(
            "CH{ch}: coefficient {}, last command {:?}",
            awg.coefficient(ch as i64)?,
            commands.last(Target::Channel(ch))
        );
    }

    awg.disconnect()
}
