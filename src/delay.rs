use embedded_hal::{
    blocking::delay::DelayUs,
    timer::{Cancel, CountDown},
};
use fugit::MicrosDurationU32;

/// Longest single timer arm in microseconds. Fits a 16 bit timer ticking at 1 MHz.
pub const MAX_ARM_US: u32 = 50_000;

/// Microsecond delay on top of a hardware count-down timer.
///
/// Each delay arms the timer, blocks until it expires and disarms it again, so the
/// timer is never left running between delays.
pub struct TimerDelay<T> {
    timer: T,
}

impl<T> TimerDelay<T>
where
    T: CountDown + Cancel,
    T::Time: From<MicrosDurationU32>,
{
    pub fn new(timer: T) -> Self {
        Self { timer }
    }

    pub fn release(self) -> T {
        self.timer
    }

    fn arm(&mut self, us: u32) {
        self.timer.start(MicrosDurationU32::micros(us));
        let _ = nb::block!(self.timer.wait());
        // Cancel only fails on a timer that is already stopped.
        let _ = self.timer.cancel();
    }
}

impl<T> DelayUs<u32> for TimerDelay<T>
where
    T: CountDown + Cancel,
    T::Time: From<MicrosDurationU32>,
{
    fn delay_us(&mut self, us: u32) {
        let mut remaining = us;
        while remaining > 0 {
            let chunk = remaining.min(MAX_ARM_US);
            self.arm(chunk);
            remaining -= chunk;
        }
    }
}
