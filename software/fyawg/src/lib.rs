//! Load-compensated control of FeelTech FY3200S dual-channel waveform generators.
//!
//! Amplitude and offset are given as the voltage wanted across the load, and
//! are scaled up for the voltage divider formed by the generator's 50 Ohm
//! output and the configured load before they reach the instrument.

pub mod config;
pub mod device;
pub mod driver;
pub mod error;
pub mod logging;

pub use config::DriverConfig;
pub use driver::{Awg, Fy3200s, build_driver};
pub use error::AwgError;
pub use fyawg_shared::{LoadImpedance, Waveform};
