#![doc = include_str!("../README.md")]
#![cfg_attr(not(feature = "std"), no_std)]

pub mod channels;
pub mod impedance;
pub mod phase;
pub mod waveform;

pub use channels::{Channel, ChannelTable, Channels, InvalidChannel, Selector};
pub use impedance::{InvalidImpedance, LoadImpedance};
pub use waveform::Waveform;

/// Number of output channels on the FY3200S
pub const FY3200S_CHANNELS: usize = 2;

/// Factory serial rate of the FY3200S. The USB bridge ignores it.
pub const FY3200S_BAUD_RATE: u32 = 9600;

/// Nominal serial timeout in milliseconds. Not applied by the hardware.
pub const FY3200S_TIMEOUT_MS: u64 = 5000;

/// Derive To/From with an added "Unknown" variant catch-all for converting
/// from numerical values that do not match a valid variant in order to
/// avoid either panicking or cumbersome error handling.
///
/// Yoinked shamelessly (with some modification) from smoltcp.
#[macro_export]
macro_rules! enum_with_unknown {
    (
        $( #[$enum_attr:meta] )*
        pub enum $name:ident($ty:ty) {
            $(
              $( #[$variant_attr:meta] )*
              $variant:ident = $value:expr
            ),+ $(,)?
        }
    ) => {
        #[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
        $( #[$enum_attr] )*
        pub enum $name {
            $(
              $( #[$variant_attr] )*
              $variant
            ),*,
            /// Catch-all for values that do not match a variant
            Unknown($ty)
        }

        impl ::core::convert::From<$ty> for $name {
            fn from(value: $ty) -> Self {
                match value {
                    $( $value => $name::$variant ),*,
                    other => $name::Unknown(other)
                }
            }
        }

        impl ::core::convert::From<$name> for $ty {
            fn from(value: $name) -> Self {
                match value {
                    $( $name::$variant => $value ),*,
                    $name::Unknown(other) => other
                }
            }
        }
    }
}
