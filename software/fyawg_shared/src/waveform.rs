//! Waveform kinds

use core::fmt;

#[cfg(feature = "ser")]
use serde::{Deserialize, Serialize};

use crate::enum_with_unknown;

enum_with_unknown! {
    /// Waveform shape of a channel output.
    ///
    /// Numeric codes follow the order of the front-panel waveform menu.
    /// Codes that do not match a named shape (arbitrary waveform slots, for
    /// example) are carried through as `Unknown`.
    #[derive(Default)]
    #[cfg_attr(feature = "ser", derive(Serialize, Deserialize))]
    pub enum Waveform(u8) {
        #[default]
        Sine = 0,
        Square = 1,
        Triangle = 2,
        RampUp = 3,
        RampDown = 4,
        Pulse = 5,
        Noise = 6,
    }
}

impl fmt::Display for Waveform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "Waveform({code})"),
            other => write!(f, "{other:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_to_named_shapes() {
        assert_eq!(Waveform::from(0), Waveform::Sine);
        assert_eq!(Waveform::from(2), Waveform::Triangle);
        assert_eq!(u8::from(Waveform::Square), 1);
        assert_eq!(Waveform::default(), Waveform::Sine);
    }

    #[test]
    fn unmatched_codes_are_kept() {
        assert_eq!(Waveform::from(17), Waveform::Unknown(17));
        assert_eq!(u8::from(Waveform::Unknown(17)), 17);
        assert_eq!(Waveform::Unknown(17).to_string(), "Waveform(17)");
        assert_eq!(Waveform::RampDown.to_string(), "RampDown");
    }

    #[cfg(feature = "ser")]
    #[test]
    fn test_ser_roundtrip() {
        let kinds = [Waveform::Triangle, Waveform::Unknown(17)];
        let json = serde_json::to_string(&kinds).unwrap();
        assert_eq!(json, r#"["Triangle",{"Unknown":17}]"#);
        assert_eq!(serde_json::from_str::<[Waveform; 2]>(&json).unwrap(), kinds);
    }
}
