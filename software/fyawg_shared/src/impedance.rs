//! Load impedance and output voltage compensation.
//!
//! The generator's output stage has a fixed source impedance, which forms a
//! voltage divider with whatever load is connected to the output. Only the
//! fraction `z / (z + R_source)` of the programmed voltage reaches the load,
//! so the programmed value has to be scaled up by the inverse of that
//! coefficient to deliver the requested voltage.

use core::fmt;

#[cfg(feature = "ser")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Internal output impedance of the generator
pub const SOURCE_IMPEDANCE_OHMS: f64 = 50.0;

/// Load assumed on every channel until configured otherwise
pub const DEFAULT_LOAD_OHMS: f64 = 50.0;

/// Impedance of the load connected to a channel output
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "ser", derive(Serialize, Deserialize))]
pub enum LoadImpedance {
    /// A finite, positive resistance in ohms
    Ohms(f64),
    /// Open circuit, e.g. the high-impedance input of another instrument
    HighZ,
}

impl LoadImpedance {
    /// Validate a finite load resistance.
    pub fn ohms(z: f64) -> Result<Self, InvalidImpedance> {
        if z.is_finite() && z > 0.0 {
            Ok(Self::Ohms(z))
        } else {
            Err(InvalidImpedance(z))
        }
    }

    /// Fraction of the programmed voltage that appears across the load, in (0, 1]
    pub fn coefficient(&self) -> f64 {
        match *self {
            Self::HighZ => 1.0,
            Self::Ohms(z) => z / (z + SOURCE_IMPEDANCE_OHMS),
        }
    }

    /// Voltage to program so that `requested` volts are delivered to this load
    pub fn compensate(&self, requested: f64) -> f64 {
        requested / self.coefficient()
    }
}

impl Default for LoadImpedance {
    fn default() -> Self {
        Self::Ohms(DEFAULT_LOAD_OHMS)
    }
}

impl fmt::Display for LoadImpedance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ohms(z) => write!(f, "{z} Ohm"),
            Self::HighZ => write!(f, "Hi-Z"),
        }
    }
}

/// A load resistance that is zero, negative, or not a number
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("invalid load impedance {0}: must be a positive number of ohms or Hi-Z")]
pub struct InvalidImpedance(pub f64);
