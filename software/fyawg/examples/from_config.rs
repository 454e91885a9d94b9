//! Build a driver from a JSON config and sweep its frequency.
//!
//! Demonstrated here:
//!   * Driver configuration and the driver registry
//!   * Session logging configured from the same file
//!   * A simple logarithmic sweep, as used for Bode plots

use fyawg::logging::init_logging;
use fyawg::*;

const CONFIG: &str = r#"{
    "driver": "fy3200s",
    "port": "/dev/ttyUSB0",
    "load_impedance": [{"Ohms": 50.0}, "HighZ"],
    "log_dir": "./software/fyawg/examples",
    "connector": {"type": "MockupConnector", "identity": "FY3200S-24M"}
}"#;

fn main() -> Result<(), AwgError> {
    let config = DriverConfig::from_json(CONFIG)?;
    println!("{}", config.to_json()?);
    if let Some(log_path) = init_logging(&config)? {
        println!("Logging to {log_path:?}");
    }

    let mut awg = build_driver(config)?;
    awg.initialize()?;
    awg.set_amplitude(0, 0.5)?;
    awg.enable_output(0, true)?;

    // 10 Hz to 100 kHz, 4 points per decade
    for i in 0..=16 {
        let hz = 10.0_f64 * 10.0_f64.powf(i as f64 / 4.0);
        awg.set_frequency(0, (hz * 100.0).round())?;
        println!("{hz:>10.1} Hz");
    }

    awg.enable_output(0, false)?;
    awg.disconnect()
}
