//! # DT35 Adapter Firmware
//!
//! Hardware specific setup etc.

pub use stm32f1xx_hal as hal;

use hal::{
    gpio::{
        gpioa::{PA3, PA4, PA5, PA6, PA7},
        Alternate, Floating, Input, Output, PullUp, PushPull,
    },
    pac::{SPI1, TIM3},
    spi::{Spi, Spi1NoRemap},
    timer::CounterUs,
};

use crate::ads1256::{ActiveLow, Ads1256, NoChipSelect};
use crate::delay::TimerDelay;

pub mod setup;
pub mod uart;

/// System timer (RTIC Monotonic) tick frequency
pub const MONOTONIC_FREQUENCY: u32 = 1_000;
rtic_monotonics::systick_monotonic!(Systick, MONOTONIC_FREQUENCY);

pub type AdcSpi = Spi<
    SPI1,
    Spi1NoRemap,
    (
        PA5<Alternate<PushPull>>,
        PA6<Input<Floating>>,
        PA7<Alternate<PushPull>>,
    ),
    u8,
>;

/// The converter on the adapter board. Its chip select is tied low.
pub type Adc = Ads1256<
    AdcSpi,
    NoChipSelect,
    ActiveLow<PA3<Input<PullUp>>>,
    PA4<Output<PushPull>>,
    TimerDelay<CounterUs<TIM3>>,
>;
