//! Channel addressing.
//!
//! Channels are numbered from 1, as on the front panel of the instrument.
//! A selector of 0 addresses every channel at once, lowest number first.
//! The number of channels is a const parameter so that a validated
//! `Channel<N>` can index a `ChannelTable<T, N>` without any bounds arithmetic
//! at the call site.

use core::fmt;
use core::ops::{Index, IndexMut};

use thiserror::Error;

/// A physical output channel, numbered `1..=N`.
///
/// Can only be constructed for a number inside `1..=N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Channel<const N: usize> {
    slot: usize,
}

impl<const N: usize> Channel<N> {
    /// Validate a 1-based channel number.
    pub fn new(number: i64) -> Result<Self, InvalidChannel> {
        match usize::try_from(number) {
            Ok(n) if (1..=N).contains(&n) => Ok(Self { slot: n - 1 }),
            _ => Err(InvalidChannel::new(Some(number), N)),
        }
    }

    /// 1-based channel number, as the instrument labels it
    pub fn number(&self) -> usize {
        self.slot + 1
    }

    /// 0-based position in per-channel storage
    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Every channel, in increasing order
    pub fn all() -> Channels<N> {
        Channels { next: 0, end: N }
    }
}

impl<const N: usize> fmt::Display for Channel<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CH{}", self.number())
    }
}

/// A validated channel selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector<const N: usize> {
    /// Selector 0: apply to every channel
    All,
    /// Selector `1..=N`: apply to exactly one channel
    Channel(Channel<N>),
}

impl<const N: usize> Selector<N> {
    /// Validate a raw selector. `None` means the caller did not name a channel at all.
    pub fn parse(selector: Option<i64>) -> Result<Self, InvalidChannel> {
        match selector {
            None => Err(InvalidChannel::new(None, N)),
            Some(0) => Ok(Self::All),
            Some(n) => Channel::new(n).map(Self::Channel),
        }
    }

    /// The channels this selector addresses, lowest number first
    pub fn channels(&self) -> Channels<N> {
        match self {
            Self::All => Channel::all(),
            Self::Channel(ch) => Channels {
                next: ch.slot,
                end: ch.slot + 1,
            },
        }
    }
}

/// Expand a raw selector into the channels it addresses.
///
/// `Some(0)` yields every channel in increasing order, `Some(k)` yields only
/// channel `k`, and anything else (including `None`) is rejected.
pub fn resolve<const N: usize>(selector: Option<i64>) -> Result<Channels<N>, InvalidChannel> {
    Ok(Selector::<N>::parse(selector)?.channels())
}

/// Validate a selector where one specific channel is mandatory.
/// Selector 0 is rejected the same way as an out-of-range number.
pub fn resolve_channel<const N: usize>(
    selector: Option<i64>,
) -> Result<Channel<N>, InvalidChannel> {
    match selector {
        Some(n) => Channel::new(n),
        None => Err(InvalidChannel::new(None, N)),
    }
}

/// Iterator over a contiguous run of channels, produced by the resolver
#[derive(Debug, Clone)]
pub struct Channels<const N: usize> {
    next: usize,
    end: usize,
}

impl<const N: usize> Iterator for Channels<N> {
    type Item = Channel<N>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next < self.end {
            let ch = Channel { slot: self.next };
            self.next += 1;
            Some(ch)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.next;
        (n, Some(n))
    }
}

impl<const N: usize> ExactSizeIterator for Channels<N> {}

/// A selector or channel number outside the valid set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidChannel {
    #[error("no channel given: channel must be in 1..{channels}")]
    Missing { channels: usize },

    #[error("invalid channel {selector}: channel must be in 1..{channels}")]
    OutOfRange { selector: i64, channels: usize },
}

impl InvalidChannel {
    /// `None` means no channel was given at all
    pub fn new(selector: Option<i64>, channels: usize) -> Self {
        match selector {
            Some(selector) => Self::OutOfRange { selector, channels },
            None => Self::Missing { channels },
        }
    }

    /// The rejected value, or `None` if no channel was given
    pub fn selector(&self) -> Option<i64> {
        match *self {
            Self::Missing { .. } => None,
            Self::OutOfRange { selector, .. } => Some(selector),
        }
    }

    /// Number of channels on the instrument
    pub fn channels(&self) -> usize {
        match *self {
            Self::Missing { channels } | Self::OutOfRange { channels, .. } => channels,
        }
    }
}

/// One value per channel, indexed by `Channel<N>`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelTable<T, const N: usize>([T; N]);

impl<T, const N: usize> ChannelTable<T, N> {
    pub fn new(values: [T; N]) -> Self {
        Self(values)
    }

    /// Pair each channel with its value, lowest channel first
    pub fn iter(&self) -> impl Iterator<Item = (Channel<N>, &T)> {
        Channel::<N>::all().zip(self.0.iter())
    }

    pub fn values(&self) -> &[T; N] {
        &self.0
    }
}

impl<T: Copy, const N: usize> ChannelTable<T, N> {
    /// The same value on every channel
    pub fn splat(value: T) -> Self {
        Self([value; N])
    }
}

impl<T: Default, const N: usize> Default for ChannelTable<T, N> {
    fn default() -> Self {
        Self(core::array::from_fn(|_| T::default()))
    }
}

impl<T, const N: usize> Index<Channel<N>> for ChannelTable<T, N> {
    type Output = T;

    fn index(&self, ch: Channel<N>) -> &T {
        &self.0[ch.slot]
    }
}

impl<T, const N: usize> IndexMut<Channel<N>> for ChannelTable<T, N> {
    fn index_mut(&mut self, ch: Channel<N>) -> &mut T {
        &mut self.0[ch.slot]
    }
}
