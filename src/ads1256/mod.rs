//! ADS1256 24 bit delta-sigma ADC driver.
//!
//! All commands are issued as single bytes with the inter-byte spacing required by the
//! converter's command decoder. DRDY gates every register write and channel read.
//! There is no interrupt path: waiting for DRDY busy-polls the pin.

use core::convert::Infallible;

use embedded_hal::{
    blocking::{delay::DelayUs, spi::Transfer},
    digital::v2::{InputPin, OutputPin},
};
use log::{debug, info, warn};

pub mod regs;

pub use regs::{
    Adcon, ChannelPair, ClockOut, Command, DataRate, Mux, Pga, Register, RegisterSet,
    SensorDetect, Status,
};

// Spacing between command bytes (t6 plus margin at 7.68 MHz).
const T_CMD_US: u32 = 5;
// Settling after the second RREG byte before data is clocked out.
const T_RREG_US: u32 = 10;
// Hold time before CS is released.
const T_CS_US: u32 = 2;

/// ADC driver errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A chip select, reset or data ready GPIO could not be accessed.
    Pin,
    /// DRDY did not assert within the bounded poll budget.
    NotReady,
}

/// Decode a 24 bit two's complement conversion result (MSB first).
pub fn decode(bytes: [u8; 3]) -> i32 {
    let code = (bytes[0] as i32) << 16 | (bytes[1] as i32) << 8 | bytes[2] as i32;
    if code & 0x80_0000 != 0 {
        -((!code & 0x7f_ffff) + 1)
    } else {
        code
    }
}

/// Source of the converter's data ready indication.
pub trait ReadySource {
    /// True when a new conversion result is available.
    fn is_ready(&mut self) -> Result<bool, Error>;
}

/// DRDY input, active low.
pub struct ActiveLow<P>(pub P);

impl<P: InputPin> ReadySource for ActiveLow<P> {
    fn is_ready(&mut self) -> Result<bool, Error> {
        self.0.is_low().map_err(|_| Error::Pin)
    }
}

/// Placeholder for boards where CS is tied low.
pub struct NoChipSelect;

impl OutputPin for NoChipSelect {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

/// How long to poll DRDY before giving up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadyWait {
    /// Poll until DRDY asserts, however long that takes.
    Unbounded,
    /// Give up with [Error::NotReady] after `polls` unsuccessful polls.
    Bounded { polls: u32 },
}

/// Register values applied during initialization.
#[derive(Clone, Copy, Debug)]
pub struct Config {
    pub status: Status,
    pub mux: Mux,
    pub adcon: Adcon,
    pub data_rate: DataRate,
    pub io: u8,
    pub ready_wait: ReadyWait,
    /// Delay after the reset pulse and after every register write in microseconds.
    pub settle_us: u32,
    /// Duration of each reset pulse phase in microseconds.
    pub reset_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Auto-calibration and analog input buffer enabled.
            status: Status::new_with_raw_value(0)
                .with_acal(true)
                .with_bufen(true),
            // AIN0 against AINCOM
            mux: ChannelPair::new(arbitrary_int::u4::new(0), ChannelPair::AINCOM).mux(),
            // Clock output off, sensor detect off, PGA 1
            adcon: Adcon::new_with_raw_value(0)
                .with_clock_out(ClockOut::Off)
                .with_sensor_detect(SensorDetect::Off)
                .with_pga(Pga::Gain1),
            data_rate: DataRate::Sps1000,
            // All digital IO low
            io: 0x00,
            ready_wait: ReadyWait::Unbounded,
            settle_us: 100_000,
            reset_us: 10_000,
        }
    }
}

/// All pins for the ADC besides the SPI bus.
/// * `cs` - Chip select, active low. Use [NoChipSelect] when not connected.
/// * `drdy` - Data ready input.
/// * `reset` - Reset output, active low.
pub struct Pins<CS, RDY, RST> {
    pub cs: CS,
    pub drdy: RDY,
    pub reset: RST,
}

/// Bus level operations sequenced by the channel scanner.
pub trait Converter {
    /// Assert or release the chip select. Selection nests.
    fn select(&mut self, active: bool) -> Result<(), Error>;
    /// Poll DRDY until the converter reports a result.
    fn wait_ready(&mut self) -> Result<(), Error>;
    /// Write a single register.
    fn write_register(&mut self, reg: Register, value: u8) -> Result<(), Error>;
    /// Issue SYNC followed by WAKEUP.
    fn synchronize(&mut self);
    /// Read the conversion result register.
    fn read_data(&mut self) -> Result<i32, Error>;
}

pub struct Ads1256<SPI, CS, RDY, RST, D> {
    spi: SPI,
    cs: CS,
    drdy: RDY,
    reset: RST,
    delay: D,
    ready_wait: ReadyWait,
    // Pair currently held in the MUX register.
    mux: Option<Mux>,
    selected: u8,
    bus_errors: u32,
}

impl<SPI, CS, RDY, RST, D> Ads1256<SPI, CS, RDY, RST, D>
where
    SPI: Transfer<u8>,
    CS: OutputPin,
    RDY: ReadySource,
    RST: OutputPin,
    D: DelayUs<u32>,
{
    /// Reset and configure the ADC.
    ///
    /// # Args
    /// * `spi` - SPI bus, mode 1 at no more than fCLKIN / 4.
    /// * `pins` - Chip select, data ready and reset pins.
    /// * `delay` - Microsecond delay provider.
    /// * `config` - Register values to apply.
    pub fn new(
        spi: SPI,
        pins: Pins<CS, RDY, RST>,
        delay: D,
        config: Config,
    ) -> Result<Self, Error> {
        let mut adc = Ads1256 {
            spi,
            cs: pins.cs,
            drdy: pins.drdy,
            reset: pins.reset,
            delay,
            ready_wait: config.ready_wait,
            mux: None,
            selected: 0,
            bus_errors: 0,
        };
        adc.cs.set_high().map_err(|_| Error::Pin)?;

        adc.select(true)?;
        let result = adc.configure(&config);
        adc.select(false)?;
        result?;

        let regs = adc.read_registers()?;
        info!("ADS1256 registers: {:?}", regs);
        if regs.status.acal() != config.status.acal()
            || regs.status.bufen() != config.status.bufen()
            || regs.mux != config.mux
            || regs.adcon != config.adcon
            || regs.data_rate() != Some(config.data_rate)
            || regs.io != config.io
        {
            warn!("ADS1256 register readback does not match configuration");
        }

        Ok(adc)
    }

    fn configure(&mut self, config: &Config) -> Result<(), Error> {
        self.reset(config.reset_us)?;
        self.delay_us(config.settle_us);

        self.write_register(Register::STATUS, config.status.raw_value())?;
        self.delay_us(config.settle_us);
        self.write_register(Register::MUX, config.mux.raw_value())?;
        self.delay_us(config.settle_us);
        self.write_register(Register::ADCON, config.adcon.raw_value())?;
        self.delay_us(config.settle_us);
        self.write_register(Register::DRATE, config.data_rate.into())?;
        self.delay_us(config.settle_us);
        self.write_register(Register::IO, config.io)?;
        self.delay_us(config.settle_us);

        self.synchronize();
        self.delay_us(config.settle_us);
        Ok(())
    }

    /// Pulse the reset line low, holding each level for `hold_us`.
    pub fn reset(&mut self, hold_us: u32) -> Result<(), Error> {
        self.reset.set_low().map_err(|_| Error::Pin)?;
        self.delay_us(hold_us);
        self.reset.set_high().map_err(|_| Error::Pin)?;
        self.delay_us(hold_us);
        self.mux = None;
        Ok(())
    }

    /// Exchange a single byte on the bus.
    ///
    /// # Note
    /// A failed transfer is counted and the byte left in the buffer is returned.
    pub fn exchange(&mut self, tx: u8) -> u8 {
        let mut buf = [tx];
        self.transfer(&mut buf);
        buf[0]
    }

    fn transfer(&mut self, buf: &mut [u8]) {
        if self.spi.transfer(buf).is_err() {
            self.bus_errors = self.bus_errors.wrapping_add(1);
            warn!("SPI transfer failed ({} total)", self.bus_errors);
        }
    }

    pub fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }

    pub fn is_ready(&mut self) -> Result<bool, Error> {
        self.drdy.is_ready()
    }

    /// Issue a command that takes no operands.
    pub fn command(&mut self, command: Command) {
        self.exchange(command as u8);
    }

    /// Read STATUS, MUX, ADCON, DRATE and IO in one burst.
    pub fn read_registers(&mut self) -> Result<RegisterSet, Error> {
        self.select(true)?;
        let result = self.wait_ready().map(|()| {
            self.exchange(Command::RREG.with_register(Register::STATUS));
            self.delay_us(T_CMD_US);
            self.exchange(0x04); // five registers
            self.delay_us(T_RREG_US);
            let mut regs = [0u8; 5];
            for reg in regs.iter_mut() {
                *reg = self.exchange(0xff);
                self.delay_us(T_CMD_US);
            }
            RegisterSet {
                status: Status::new_with_raw_value(regs[0]),
                mux: Mux::new_with_raw_value(regs[1]),
                adcon: Adcon::new_with_raw_value(regs[2]),
                drate: regs[3],
                io: regs[4],
            }
        });
        self.select(false)?;
        result
    }

    /// Convert a single differential pair.
    ///
    /// The MUX register is only written if the pair differs from the one configured last.
    pub fn read_channel(&mut self, pair: ChannelPair) -> Result<i32, Error> {
        self.select(true)?;
        let result = self.convert(pair.mux());
        self.select(false)?;
        result
    }

    fn convert(&mut self, mux: Mux) -> Result<i32, Error> {
        self.wait_ready()?;
        if self.mux != Some(mux) {
            self.write_register(Register::MUX, mux.raw_value())?;
        }
        self.synchronize();
        self.wait_ready()?;
        self.read_data()
    }

    /// Number of failed SPI transfers since construction.
    pub fn bus_errors(&self) -> u32 {
        self.bus_errors
    }

    /// The pair last written to the MUX register, if known.
    pub fn channel_pair(&self) -> Option<ChannelPair> {
        self.mux.map(ChannelPair::from)
    }
}

impl<SPI, CS, RDY, RST, D> Converter for Ads1256<SPI, CS, RDY, RST, D>
where
    SPI: Transfer<u8>,
    CS: OutputPin,
    RDY: ReadySource,
    RST: OutputPin,
    D: DelayUs<u32>,
{
    fn select(&mut self, active: bool) -> Result<(), Error> {
        if active {
            if self.selected == 0 {
                self.cs.set_low().map_err(|_| Error::Pin)?;
            }
            self.selected += 1;
        } else if self.selected > 0 {
            self.selected -= 1;
            if self.selected == 0 {
                self.delay_us(T_CS_US);
                self.cs.set_high().map_err(|_| Error::Pin)?;
            }
        }
        Ok(())
    }

    fn wait_ready(&mut self) -> Result<(), Error> {
        match self.ready_wait {
            ReadyWait::Unbounded => {
                while !self.drdy.is_ready()? {}
                Ok(())
            }
            ReadyWait::Bounded { polls } => {
                for _ in 0..polls {
                    if self.drdy.is_ready()? {
                        return Ok(());
                    }
                }
                debug!("DRDY not asserted after {} polls", polls);
                Err(Error::NotReady)
            }
        }
    }

    fn write_register(&mut self, reg: Register, value: u8) -> Result<(), Error> {
        self.select(true)?;
        let result = self.wait_ready().map(|()| {
            self.exchange(Command::WREG.with_register(reg));
            self.delay_us(T_CMD_US);
            self.exchange(0x00); // one register
            self.delay_us(T_CMD_US);
            self.exchange(value);
            self.delay_us(T_CMD_US);
            if reg == Register::MUX {
                self.mux = Some(Mux::new_with_raw_value(value));
            }
        });
        self.select(false)?;
        result
    }

    fn synchronize(&mut self) {
        self.command(Command::SYNC);
        self.command(Command::WAKEUP);
    }

    fn read_data(&mut self) -> Result<i32, Error> {
        self.select(true)?;
        self.command(Command::RDATA);
        self.delay_us(T_CMD_US);
        let mut buf = [0u8; 3];
        self.transfer(&mut buf);
        self.select(false)?;
        Ok(decode(buf))
    }
}
