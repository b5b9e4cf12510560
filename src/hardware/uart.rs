//! Frame transmission over USART1 with DMA.

use super::hal::{
    dma::{Transfer, WriteDma, R},
    serial::TxDma1,
};

use crate::frame::{FrameBuffer, Link, Pending, Transmit};

impl Transmit for TxDma1 {
    type Transfer = Transfer<R, FrameBuffer, TxDma1>;

    fn start(self, buffer: FrameBuffer) -> Self::Transfer {
        self.write(buffer)
    }
}

impl Pending<TxDma1> for Transfer<R, FrameBuffer, TxDma1> {
    fn is_done(&self) -> bool {
        Transfer::is_done(self)
    }

    fn finish(self) -> (FrameBuffer, TxDma1) {
        self.wait()
    }
}

/// Serial link that owns the frame buffer while a DMA transfer is in flight.
pub type FrameLink = Link<TxDma1>;
