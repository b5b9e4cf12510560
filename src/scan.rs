//! Round-robin scan of the four differential channels.
//!
//! Each step programs the MUX for the next pair and restarts the converter, then
//! immediately clocks out the result register. That result still belongs to the
//! conversion started by the previous step, so the sample read while addressing
//! channel `i` is stored for channel `i - 1`. After the first cycle the last slot
//! holds whatever the converter had been sampling before the scan started.

use log::debug;

use crate::ads1256::{Converter, Error, Register};
use crate::Channel;

pub mod sm {
    use log::debug;
    use smlang::statemachine;

    statemachine! {
        derive_states: [Debug, Clone, Copy],
        transitions: {
            *Priming + ScanComplete = Filling,
            Filling + ScanComplete = Streaming,
            Streaming + ScanComplete = Streaming,
            // An aborted cycle leaves the converter pipeline out of step with the buffer.
            _ + CycleFailed = Priming,
        }
    }

    pub struct Lifecycle;

    impl StateMachineContext for Lifecycle {
        fn transition_callback(&self, old: &States, new: &States) {
            if old != new {
                debug!("Scan lifecycle {:?} -> {:?}", old, new);
            }
        }
    }
}

pub struct Scanner<A> {
    adc: A,
    data: [i32; 4],
    cycles: u32,
    lifecycle: sm::StateMachine<sm::Lifecycle>,
}

impl<A: Converter> Scanner<A> {
    pub fn new(adc: A) -> Self {
        Self {
            adc,
            data: [0; 4],
            cycles: 0,
            lifecycle: sm::StateMachine::new(sm::Lifecycle),
        }
    }

    /// Run one full scan cycle over all channels.
    ///
    /// # Note
    /// The bus is released even if the cycle fails. Slots written before the failure
    /// keep their new values, and the buffer is unstable again until two further
    /// cycles complete.
    pub fn scan(&mut self) -> Result<(), Error> {
        self.adc.select(true)?;
        let result = self.cycle();
        let result = self.adc.select(false).and(result);

        let event = match result {
            Ok(()) => {
                self.cycles = self.cycles.wrapping_add(1);
                sm::Events::ScanComplete
            }
            Err(_) => sm::Events::CycleFailed,
        };
        // Every state accepts both events.
        let _ = self.lifecycle.process_event(event);
        result
    }

    fn cycle(&mut self) -> Result<(), Error> {
        for ch in Channel::ALL {
            self.adc.wait_ready()?;
            self.adc.write_register(Register::MUX, ch.pair().into())?;
            self.adc.synchronize();
            self.data[ch.previous() as usize] = self.adc.read_data()?;
        }
        Ok(())
    }

    /// Latest sample of each channel, indexed by [Channel].
    pub fn data(&self) -> &[i32; 4] {
        &self.data
    }

    /// True once every slot holds a sample of its own channel.
    pub fn is_stable(&self) -> bool {
        matches!(self.lifecycle.state(), sm::States::Streaming)
    }

    /// Number of completed cycles.
    pub fn cycles(&self) -> u32 {
        self.cycles
    }

    pub fn adc(&self) -> &A {
        &self.adc
    }
}
