//! Driver configuration, stored as JSON.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use fyawg_shared::{FY3200S_BAUD_RATE, FY3200S_TIMEOUT_MS, LoadImpedance};

use crate::device::Connector;
use crate::driver::Fy3200s;
use crate::error::AwgError;

/// Everything needed to build and connect a driver
#[derive(Serialize, Deserialize, Debug)]
#[non_exhaustive]
pub struct DriverConfig {
    /// Registry name of the driver, e.g. `fy3200s`
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Serial port name, passed to the connector
    pub port: String,

    /// Accepted for compatibility; the FY3200S ignores it
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Accepted for compatibility; not applied
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Load on channels 1, 2, ... in order.
    /// Channels without an entry keep the 50 Ohm default.
    #[serde(default)]
    pub load_impedance: Vec<LoadImpedance>,

    /// Program a sine wave whatever waveform is requested
    #[serde(default)]
    pub force_sine: bool,

    /// Directory for session log files, see `logging::init_logging`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Backend that opens the device handle
    pub connector: Box<dyn Connector>,
}

fn default_driver() -> String {
    Fy3200s::SHORT_NAME.to_owned()
}

fn default_baud_rate() -> u32 {
    FY3200S_BAUD_RATE
}

fn default_timeout_ms() -> u64 {
    FY3200S_TIMEOUT_MS
}

impl DriverConfig {
    /// FY3200S defaults on `port`
    pub fn new(port: &str, connector: Box<dyn Connector>) -> Self {
        Self {
            driver: default_driver(),
            port: port.to_owned(),
            baud_rate: default_baud_rate(),
            timeout_ms: default_timeout_ms(),
            load_impedance: Vec::new(),
            force_sine: false,
            log_dir: None,
            connector,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, AwgError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, AwgError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Read a config file
    pub fn load(path: &Path) -> Result<Self, AwgError> {
        let json = std::fs::read_to_string(path).map_err(|source| AwgError::ConfigRead {
            path: path.to_owned(),
            source,
        })?;
        Self::from_json(&json)
    }
}
