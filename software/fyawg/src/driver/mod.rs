//! Waveform generator drivers.
//!
//! Every driver implements the object-safe `Awg` trait, so callers such as a
//! Bode plot sweep can drive any supported instrument as a `Box<dyn Awg>`
//! built from a `DriverConfig`.

use std::collections::BTreeMap;

use core::fmt::Debug;

use once_cell::sync::Lazy;

use fyawg_shared::{LoadImpedance, Waveform};

use crate::config::DriverConfig;
use crate::error::AwgError;

pub mod fy3200s;
pub use fy3200s::Fy3200s;

/// Builds a driver from its config
pub type DriverFn = fn(DriverConfig) -> Result<Box<dyn Awg>, AwgError>;

/// Map of driver short names to constructors
pub static DRIVERS: Lazy<BTreeMap<&'static str, DriverFn>> = Lazy::new(|| {
    BTreeMap::<&'static str, DriverFn>::from([(Fy3200s::SHORT_NAME, Fy3200s::boxed as DriverFn)])
});

/// Build the driver named in `config.driver`.
pub fn build_driver(config: DriverConfig) -> Result<Box<dyn Awg>, AwgError> {
    let ctor = DRIVERS
        .get(config.driver.as_str())
        .ok_or_else(|| AwgError::UnknownDriver(config.driver.clone()))?;
    ctor(config)
}

/// Dual-channel waveform generator.
///
/// Channel selectors are 0 for "every channel" or a 1-based channel number.
/// Commands addressed to every channel are applied one channel at a time,
/// lowest number first, and are not rolled back if a later channel fails.
pub trait Awg: Send + Debug {
    /// Registry name of the driver
    fn short_name(&self) -> &'static str;

    fn channel_count(&self) -> usize;

    /// Reset output state, connect, and switch every output off
    fn initialize(&mut self) -> Result<(), AwgError>;

    /// Open the device handle
    fn connect(&mut self) -> Result<(), AwgError>;

    /// Close the device handle, if open
    fn disconnect(&mut self) -> Result<(), AwgError>;

    fn is_connected(&self) -> bool;

    /// Instrument identification string
    fn get_id(&mut self) -> Result<String, AwgError>;

    fn enable_output(&mut self, selector: i64, on: bool) -> Result<(), AwgError>;

    /// Frequency in centihertz
    fn set_frequency(&mut self, selector: i64, centihertz: f64) -> Result<(), AwgError>;

    /// Phase of channel 2 relative to channel 1, in degrees
    fn set_phase(&mut self, degrees: f64) -> Result<(), AwgError>;

    fn set_wave_type(&mut self, selector: i64, kind: Waveform) -> Result<(), AwgError>;

    /// Amplitude delivered to the load, in volts
    fn set_amplitude(&mut self, selector: i64, volts: f64) -> Result<(), AwgError>;

    /// DC offset delivered to the load, in volts
    fn set_offset(&mut self, selector: i64, volts: f64) -> Result<(), AwgError>;

    /// Record the load connected to one channel. Selector 0 is rejected.
    fn set_load_impedance(&mut self, channel: i64, z: LoadImpedance) -> Result<(), AwgError>;

    fn load_impedance(&self, channel: i64) -> Result<LoadImpedance, AwgError>;

    /// Fraction of the programmed voltage that reaches the load on a channel
    fn coefficient(&self, channel: i64) -> Result<f64, AwgError>;

    fn output_enabled(&self, channel: i64) -> Result<bool, AwgError>;
}
