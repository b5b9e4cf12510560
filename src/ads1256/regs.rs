// (ADS1256 https://www.ti.com/lit/ds/symlink/ads1256.pdf)

use arbitrary_int::{u2, u3, u4};
use bitbybit::{bitenum, bitfield};
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};
use strum::EnumIter;

// ADC Register Adresses
#[allow(unused)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    STATUS = 0x00,
    MUX = 0x01,
    ADCON = 0x02,
    DRATE = 0x03,
    IO = 0x04,
    OFC0 = 0x05,
    OFC1 = 0x06,
    OFC2 = 0x07,
    FSC0 = 0x08,
    FSC1 = 0x09,
    FSC2 = 0x0a,
}

// SPI command opcodes. WREG and RREG carry the start register in their low nibble
// and are followed by a second byte holding the register count minus one.
#[allow(unused)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    RDATA = 0x01,    // Read data once (after DRDY goes low)
    RDATAC = 0x03,   // Read data continuously
    SDATAC = 0x0f,   // Stop read data continuously
    RREG = 0x10,     // Read from registers, 0001 rrrr
    WREG = 0x50,     // Write to registers, 0101 rrrr
    SELFCAL = 0xf0,  // Offset and gain self-calibration
    SELFOCAL = 0xf1, // Offset self-calibration
    SELFGCAL = 0xf2, // Gain self-calibration
    SYSOCAL = 0xf3,  // System offset calibration
    SYSGCAL = 0xf4,  // System gain calibration
    SYNC = 0xfc,     // Synchronize the A/D conversion
    STANDBY = 0xfd,  // Begin standby mode
    RESET = 0xfe,    // Reset to power-up values
    WAKEUP = 0xff,   // Complete SYNC and exit standby mode
}

impl Command {
    /// First byte of a register command addressing `reg`.
    pub fn with_register(self, reg: Register) -> u8 {
        self as u8 | (reg as u8 & 0x0f)
    }
}

// *Note*: Register bitfields are not exhaustive.

/// STATUS register.
#[bitfield(u8)]
#[derive(Debug, PartialEq, Eq)]
pub struct Status {
    /// Factory programmed identification bits.
    #[bits(4..=7, r)]
    id: u4,
    /// Output data bit order, false is MSB first.
    #[bit(3, rw)]
    order: bool,
    /// Auto-calibration. Recalibrates on writes to PGA, DR or BUFEN.
    #[bit(2, rw)]
    acal: bool,
    /// Analog input buffer enable.
    #[bit(1, rw)]
    bufen: bool,
    /// Mirror of the DRDY pin.
    #[bit(0, r)]
    drdy: bool,
}

/// MUX register. Positive input in the high nibble, negative input in the low nibble.
/// Values 0..=7 select AIN0..AIN7, any value with bit 3 set selects AINCOM.
#[bitfield(u8)]
#[derive(Debug, PartialEq, Eq)]
pub struct Mux {
    #[bits(4..=7, rw)]
    psel: u4,
    #[bits(0..=3, rw)]
    nsel: u4,
}

#[derive(Debug, PartialEq)]
#[bitenum(u2, exhaustive = true)]
pub enum ClockOut {
    Off = 0,
    Fclkin = 1,
    Half = 2,
    Quarter = 3,
}

#[derive(Debug, PartialEq)]
#[bitenum(u2, exhaustive = true)]
pub enum SensorDetect {
    Off = 0,
    Ua0_5 = 1,
    Ua2 = 2,
    Ua10 = 3,
}

/// Programmable gain amplifier setting. Codes 6 and 7 both select a gain of 64.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[bitenum(u3, exhaustive = true)]
pub enum Pga {
    Gain1 = 0,
    Gain2 = 1,
    Gain4 = 2,
    Gain8 = 3,
    Gain16 = 4,
    Gain32 = 5,
    Gain64 = 6,
    Gain64Alt = 7,
}

/// ADCON register.
#[bitfield(u8)]
#[derive(Debug, PartialEq, Eq)]
pub struct Adcon {
    /// D0/CLKOUT rate. Only reset through the RESET pin.
    #[bits(5..=6, rw)]
    clock_out: ClockOut,
    /// Sensor detect current sources.
    #[bits(3..=4, rw)]
    sensor_detect: SensorDetect,
    #[bits(0..=2, rw)]
    pga: Pga,
}

/// DRATE register codes.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    TryFromPrimitive,
    IntoPrimitive,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[repr(u8)]
pub enum DataRate {
    Sps2_5 = 0x03,
    Sps5 = 0x13,
    Sps10 = 0x23,
    Sps15 = 0x33,
    Sps25 = 0x43,
    Sps30 = 0x53,
    Sps50 = 0x63,
    Sps60 = 0x72,
    Sps100 = 0x82,
    Sps500 = 0x92,
    Sps1000 = 0xa1,
    Sps2000 = 0xb0,
    Sps3750 = 0xc0,
    Sps7500 = 0xd0,
    Sps15000 = 0xe0,
    Sps30000 = 0xf0,
}

impl DataRate {
    /// Output data rate in tenths of samples per second.
    pub fn decisps(&self) -> u32 {
        match self {
            Self::Sps2_5 => 25,
            Self::Sps5 => 50,
            Self::Sps10 => 100,
            Self::Sps15 => 150,
            Self::Sps25 => 250,
            Self::Sps30 => 300,
            Self::Sps50 => 500,
            Self::Sps60 => 600,
            Self::Sps100 => 1_000,
            Self::Sps500 => 5_000,
            Self::Sps1000 => 10_000,
            Self::Sps2000 => 20_000,
            Self::Sps3750 => 37_500,
            Self::Sps7500 => 75_000,
            Self::Sps15000 => 150_000,
            Self::Sps30000 => 300_000,
        }
    }

    /// Duration of one conversion in microseconds, rounded up.
    pub fn period_us(&self) -> u32 {
        10_000_000u32.div_ceil(self.decisps())
    }
}

impl Default for DataRate {
    fn default() -> Self {
        Self::Sps1000
    }
}

/// A differential input pair as selected through the MUX register.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelPair {
    positive: u4,
    negative: u4,
}

impl ChannelPair {
    /// Common analog input.
    pub const AINCOM: u4 = u4::new(8);

    pub const fn new(positive: u4, negative: u4) -> Self {
        Self { positive, negative }
    }

    pub fn positive(&self) -> u4 {
        self.positive
    }

    pub fn negative(&self) -> u4 {
        self.negative
    }

    pub fn mux(&self) -> Mux {
        Mux::new_with_raw_value(0)
            .with_psel(self.positive)
            .with_nsel(self.negative)
    }
}

impl From<ChannelPair> for u8 {
    fn from(pair: ChannelPair) -> u8 {
        pair.mux().raw_value()
    }
}

impl From<Mux> for ChannelPair {
    fn from(mux: Mux) -> Self {
        Self::new(mux.psel(), mux.nsel())
    }
}

/// Snapshot of the five control registers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterSet {
    pub status: Status,
    pub mux: Mux,
    pub adcon: Adcon,
    pub drate: u8,
    pub io: u8,
}

impl RegisterSet {
    pub fn data_rate(&self) -> Option<DataRate> {
        DataRate::try_from(self.drate).ok()
    }
}
