//! Device handle capability.
//!
//! The serial transport and the vendor command encoding live behind these
//! traits. The driver only ever talks to an instrument through a
//! `DeviceHandle` obtained from a `Connector`, and never sees bytes on the wire.

use core::fmt::Debug;

use thiserror::Error;

use fyawg_shared::Waveform;

pub mod mockup;
pub use mockup::{Command, CommandLog, MockupConnector, Setting, Target};

/// Failure reported by a device handle
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("serial I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("device rejected {command}: {reason}")]
    Rejected { command: String, reason: String },

    #[error("device has no channel {0}")]
    NoSuchChannel(usize),
}

/// Opens device handles.
///
/// Serializable as `Box<dyn Connector>` so that the transport backend
/// can be chosen from a driver config file.
#[typetag::serde(tag = "type")]
pub trait Connector: Send + Sync + Debug {
    /// Open the instrument on `port`
    fn connect(&self, port: &str) -> Result<Box<dyn DeviceHandle>, DeviceError>;
}

/// An open connection to one instrument
pub trait DeviceHandle: Send + Debug {
    /// Model identification string reported by the instrument
    fn identity(&mut self) -> Result<String, DeviceError>;

    /// Number of output channels
    fn channel_count(&self) -> usize;

    /// Sub-handle for a 1-based channel number
    fn channel(&mut self, number: usize) -> Option<&mut dyn DeviceChannel>;

    /// Phase of channel 2 relative to channel 1, in degrees
    fn phase(&mut self, degrees: f64) -> Result<(), DeviceError>;

    /// Release the port
    fn close(&mut self) -> Result<(), DeviceError>;
}

/// Per-channel setters
pub trait DeviceChannel: Send + Debug {
    fn enable_output(&mut self, on: bool) -> Result<(), DeviceError>;

    /// Frequency in centihertz
    fn frequency(&mut self, centihertz: f64) -> Result<(), DeviceError>;

    fn waveform(&mut self, kind: Waveform) -> Result<(), DeviceError>;

    /// Amplitude as programmed into the instrument, in volts
    fn amplitude(&mut self, volts: f64) -> Result<(), DeviceError>;

    /// DC offset as programmed into the instrument, in volts
    fn offset(&mut self, volts: f64) -> Result<(), DeviceError>;
}
