#![cfg_attr(not(test), no_std)]

#[cfg(target_os = "none")]
pub mod hardware;

pub mod ads1256;
pub mod delay;
pub mod frame;
pub mod metadata;
pub mod scan;
pub mod settings;

#[cfg(test)]
mod sim;

use arbitrary_int::{u2, u4};
use bitbybit::bitenum;

use ads1256::ChannelPair;

/// Differential input channels of the adapter, in scan order.
#[derive(Debug, PartialEq, PartialOrd)]
#[bitenum(u2, exhaustive = true)]
pub enum Channel {
    One = 0,
    Two = 1,
    Three = 2,
    Four = 3,
}

impl Channel {
    pub const ALL: [Self; 4] = [Self::One, Self::Two, Self::Three, Self::Four];

    /// Input pair (2i, 2i + 1) wired to this channel.
    pub fn pair(&self) -> ChannelPair {
        let positive = self.raw_value().value() << 1;
        ChannelPair::new(u4::new(positive), u4::new(positive | 1))
    }

    /// Tag byte preceding this channel in an output frame.
    pub fn tag(&self) -> u8 {
        self.raw_value().value() + 1
    }

    /// The channel scanned before this one, wrapping around.
    pub fn previous(&self) -> Self {
        Self::new_with_raw_value(self.raw_value().wrapping_sub(u2::new(1)))
    }
}
