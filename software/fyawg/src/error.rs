//! Error taxonomy for driver operations

use std::path::PathBuf;

use thiserror::Error;

use fyawg_shared::{InvalidChannel, InvalidImpedance};

use crate::device::DeviceError;

#[derive(Debug, Error)]
pub enum AwgError {
    /// Selector or channel number outside the valid set
    #[error(transparent)]
    InvalidChannel(#[from] InvalidChannel),

    /// Failure reported by the device handle, passed through unchanged
    #[error("transport failure: {0}")]
    Transport(#[from] DeviceError),

    #[error("not connected to an instrument")]
    NotConnected,

    #[error("device reports {found} channels, driver expects {expected}")]
    ChannelCountMismatch { expected: usize, found: usize },

    #[error(transparent)]
    InvalidImpedance(#[from] InvalidImpedance),

    #[error("invalid {what}: {value}")]
    InvalidValue { what: &'static str, value: f64 },

    #[error("unknown driver `{0}`")]
    UnknownDriver(String),

    #[error("failed to read config {path:?}: {source}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Config(String),

    #[error("logging setup failed: {0}")]
    Logging(String),
}
