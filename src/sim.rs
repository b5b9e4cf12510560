//! Simulated ADS1256 behind the embedded-hal traits.
//!
//! All peripherals share one state and append to one event log, so tests can assert the
//! exact ordering of bus bytes, DRDY polls, chip select edges and delays. Delays advance a
//! simulated clock instead of sleeping.
//!
//! The converter model keeps a register file, parses the command stream and models the
//! conversion pipeline: WAKEUP starts a conversion on the current MUX setting, which only
//! completes (and replaces the output register) once DRDY is polled as ready.

use core::convert::Infallible;
use std::{cell::RefCell, rc::Rc, vec::Vec};

use embedded_hal::{
    blocking::{delay::DelayUs, spi::Transfer},
    digital::v2::{InputPin, OutputPin},
};

use crate::ads1256::{ActiveLow, Ads1256, Config, Pins, Register};

/// Bus and pin activity in order of occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    /// Chip select edge, true when asserted (low).
    Select(bool),
    /// Reset line edge, true when asserted (low).
    Reset(bool),
    Byte { tx: u8, rx: u8 },
    /// DRDY poll result, true when ready.
    Ready(bool),
    Delay(u32),
}

/// Decoded converter commands.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Op {
    Wreg(u8, u8),
    Rreg(u8, u8),
    Rdata,
    Sync,
    Wakeup,
    Reset,
}

#[derive(Clone, Copy, Debug)]
enum Phase {
    Idle,
    WregCount { reg: u8 },
    WregData { reg: u8, remaining: u8 },
    RregCount { reg: u8 },
    RregData { reg: u8, remaining: u8 },
    Rdata { index: usize },
}

const POWER_UP: [u8; 11] = [0x30, 0x01, 0x20, 0xf0, 0xe0, 0, 0, 0, 0, 0, 0];

struct State {
    events: Vec<Event>,
    ops: Vec<(Op, bool)>,
    regs: [u8; 11],
    phase: Phase,
    output: i32,
    in_flight: Option<u8>,
    busy_polls: u32,
    busy: u32,
    stuck: bool,
    last_poll: Option<bool>,
    guard: bool,
    failures: u32,
    cs_low: bool,
    elapsed_us: u64,
}

impl State {
    fn new() -> Self {
        Self {
            events: Vec::new(),
            ops: Vec::new(),
            regs: POWER_UP,
            phase: Phase::Idle,
            output: 0,
            in_flight: Some(POWER_UP[Register::MUX as usize]),
            busy_polls: 0,
            busy: 0,
            stuck: false,
            last_poll: None,
            guard: false,
            failures: 0,
            cs_low: false,
            elapsed_us: 0,
        }
    }

    fn power_up(&mut self) {
        self.regs = POWER_UP;
        self.phase = Phase::Idle;
        self.in_flight = Some(POWER_UP[Register::MUX as usize]);
    }

    fn poll(&mut self) -> bool {
        let ready = if self.stuck {
            false
        } else if self.busy > 0 {
            self.busy -= 1;
            false
        } else {
            if let Some(mux) = self.in_flight.take() {
                self.output = Sim::level(mux);
            }
            true
        };
        self.last_poll = Some(ready);
        self.events.push(Event::Ready(ready));
        ready
    }

    fn opcode(&mut self) {
        self.guard = self.last_poll == Some(true);
        self.last_poll = None;
    }

    fn op(&mut self, op: Op) {
        self.ops.push((op, self.guard));
    }

    fn write(&mut self, reg: u8, value: u8) {
        let reg = reg as usize;
        if reg == Register::STATUS as usize {
            // ID and DRDY are read only
            self.regs[reg] = (self.regs[reg] & 0xf1) | (value & 0x0e);
        } else if reg < self.regs.len() {
            self.regs[reg] = value;
        }
    }

    fn exchange(&mut self, tx: u8) -> u8 {
        let mut rx = 0;
        self.phase = match self.phase {
            Phase::Idle => match tx {
                0x50..=0x5f => {
                    self.opcode();
                    Phase::WregCount { reg: tx & 0x0f }
                }
                0x10..=0x1f => {
                    self.opcode();
                    Phase::RregCount { reg: tx & 0x0f }
                }
                0x01 => {
                    self.opcode();
                    self.op(Op::Rdata);
                    Phase::Rdata { index: 0 }
                }
                0xfc => {
                    self.opcode();
                    self.op(Op::Sync);
                    Phase::Idle
                }
                0xff => {
                    self.opcode();
                    self.op(Op::Wakeup);
                    self.in_flight = Some(self.regs[Register::MUX as usize]);
                    self.busy = self.busy_polls;
                    Phase::Idle
                }
                0xfe => {
                    self.opcode();
                    self.op(Op::Reset);
                    self.power_up();
                    Phase::Idle
                }
                _ => Phase::Idle,
            },
            Phase::WregCount { reg } => Phase::WregData {
                reg,
                remaining: tx + 1,
            },
            Phase::WregData { reg, remaining } => {
                self.write(reg, tx);
                self.op(Op::Wreg(reg, tx));
                if remaining > 1 {
                    Phase::WregData {
                        reg: reg + 1,
                        remaining: remaining - 1,
                    }
                } else {
                    Phase::Idle
                }
            }
            Phase::RregCount { reg } => {
                self.op(Op::Rreg(reg, tx + 1));
                Phase::RregData {
                    reg,
                    remaining: tx + 1,
                }
            }
            Phase::RregData { reg, remaining } => {
                rx = self.regs.get(reg as usize).copied().unwrap_or(0);
                if remaining > 1 {
                    Phase::RregData {
                        reg: reg + 1,
                        remaining: remaining - 1,
                    }
                } else {
                    Phase::Idle
                }
            }
            Phase::Rdata { index } => {
                rx = self.output.to_be_bytes()[index + 1];
                if index < 2 {
                    Phase::Rdata { index: index + 1 }
                } else {
                    Phase::Idle
                }
            }
        };
        self.events.push(Event::Byte { tx, rx });
        rx
    }
}

/// Handle to the simulated converter.
#[derive(Clone)]
pub struct Sim(Rc<RefCell<State>>);

pub type SimAdc = Ads1256<SimSpi, SimCs, ActiveLow<SimDrdy>, SimReset, SimDelay>;

impl Sim {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(State::new())))
    }

    /// Input level seen by the converter for a MUX setting.
    pub fn level(mux: u8) -> i32 {
        (mux as i32 - 0x40) * 10_007
    }

    /// Construct and initialize a driver wired to this converter.
    pub fn adc(&self, config: Config) -> SimAdc {
        Ads1256::new(
            self.spi(),
            Pins {
                cs: SimCs(self.0.clone()),
                drdy: ActiveLow(self.drdy()),
                reset: self.reset_pin(),
            },
            self.delay(),
            config,
        )
        .unwrap()
    }

    pub fn spi(&self) -> SimSpi {
        SimSpi(self.0.clone())
    }

    pub fn drdy(&self) -> SimDrdy {
        SimDrdy(self.0.clone())
    }

    pub fn reset_pin(&self) -> SimReset {
        SimReset(self.0.clone())
    }

    pub fn delay(&self) -> SimDelay {
        SimDelay(self.0.clone())
    }

    /// Forget all recorded events and commands.
    pub fn clear(&self) {
        let mut state = self.0.borrow_mut();
        state.events.clear();
        state.ops.clear();
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.borrow().events.clone()
    }

    pub fn ops(&self) -> Vec<Op> {
        self.0.borrow().ops.iter().map(|(op, _)| *op).collect()
    }

    /// Commands paired with whether DRDY was last polled as ready before their opcode.
    pub fn guarded_ops(&self) -> Vec<(Op, bool)> {
        self.0.borrow().ops.clone()
    }

    pub fn mux_writes(&self) -> usize {
        self.ops()
            .iter()
            .filter(|op| matches!(op, Op::Wreg(reg, _) if *reg == Register::MUX as u8))
            .count()
    }

    pub fn register(&self, reg: Register) -> u8 {
        self.0.borrow().regs[reg as usize]
    }

    pub fn set_output(&self, value: i32) {
        let mut state = self.0.borrow_mut();
        state.output = value;
        state.in_flight = None;
    }

    /// Number of polls DRDY stays high after each WAKEUP.
    pub fn set_busy_polls(&self, polls: u32) {
        self.0.borrow_mut().busy_polls = polls;
    }

    /// Keep DRDY high forever.
    pub fn set_stuck(&self, stuck: bool) {
        self.0.borrow_mut().stuck = stuck;
    }

    /// Fail the next `count` SPI transfers.
    pub fn fail_transfers(&self, count: u32) {
        self.0.borrow_mut().failures = count;
    }

    pub fn elapsed_us(&self) -> u64 {
        self.0.borrow().elapsed_us
    }
}

#[derive(Debug)]
pub struct BusFault;

pub struct SimSpi(Rc<RefCell<State>>);

impl Transfer<u8> for SimSpi {
    type Error = BusFault;

    fn transfer<'w>(&mut self, words: &'w mut [u8]) -> Result<&'w [u8], Self::Error> {
        let mut state = self.0.borrow_mut();
        if state.failures > 0 {
            state.failures -= 1;
            return Err(BusFault);
        }
        for word in words.iter_mut() {
            *word = state.exchange(*word);
        }
        Ok(words)
    }
}

pub struct SimCs(Rc<RefCell<State>>);

impl OutputPin for SimCs {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        if !state.cs_low {
            state.cs_low = true;
            state.events.push(Event::Select(true));
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        if state.cs_low {
            state.cs_low = false;
            state.events.push(Event::Select(false));
        }
        Ok(())
    }
}

pub struct SimReset(Rc<RefCell<State>>);

impl OutputPin for SimReset {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.0.borrow_mut();
        state.power_up();
        state.events.push(Event::Reset(true));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().events.push(Event::Reset(false));
        Ok(())
    }
}

pub struct SimDrdy(Rc<RefCell<State>>);

impl InputPin for SimDrdy {
    type Error = Infallible;

    fn is_high(&self) -> Result<bool, Self::Error> {
        self.is_low().map(|low| !low)
    }

    fn is_low(&self) -> Result<bool, Self::Error> {
        Ok(self.0.borrow_mut().poll())
    }
}

pub struct SimDelay(Rc<RefCell<State>>);

impl DelayUs<u32> for SimDelay {
    fn delay_us(&mut self, us: u32) {
        let mut state = self.0.borrow_mut();
        state.elapsed_us += us as u64;
        state.events.push(Event::Delay(us));
    }
}
