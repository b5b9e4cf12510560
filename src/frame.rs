//! Output frame serialization.
//!
//! A frame carries one sample per channel:
//!
//! `AA BB | 01 v0 v1 v2 v3 | 02 .. | 03 .. | 04 .. | CC DD`
//!
//! 24 bytes in total.

use bytemuck::{Pod, Zeroable};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::Channel;

pub const HEADER: [u8; 2] = [0xaa, 0xbb];
pub const TRAILER: [u8; 2] = [0xcc, 0xdd];
pub const FRAME_LEN: usize = core::mem::size_of::<Frame>();

/// Byte order of the channel values within a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Layout {
    /// Most significant byte first.
    #[default]
    BigEndian,
    /// Bytes 31..24, 23..16 and 7..0 followed by a zero byte, as emitted by earlier
    /// firmware revisions. Bits 15..8 are lost.
    Legacy,
}

/// Split a sample into the four value bytes of a frame slot.
pub fn split(value: i32, layout: Layout) -> [u8; 4] {
    let b = value.to_be_bytes();
    match layout {
        Layout::BigEndian => b,
        Layout::Legacy => [b[0], b[1], b[3], 0],
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Slot {
    pub tag: u8,
    pub value: [u8; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Frame {
    pub header: [u8; 2],
    pub slots: [Slot; 4],
    pub trailer: [u8; 2],
}

impl Frame {
    pub fn build(data: &[i32; 4], layout: Layout) -> Self {
        Self {
            header: HEADER,
            slots: Channel::ALL.map(|ch| Slot {
                tag: ch.tag(),
                value: split(data[ch as usize], layout),
            }),
            trailer: TRAILER,
        }
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        bytemuck::cast_ref(self)
    }
}

/// The sink is still transmitting the previous frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Busy;

/// Transmit path for frames.
pub trait FrameSink {
    /// Start transmitting `frame`. The sink keeps its own copy until the transfer is done.
    fn send(&mut self, frame: &Frame) -> Result<(), Busy>;
}

/// Frame storage owned by the transmitter while a transfer is in flight.
pub type FrameBuffer = &'static mut [u8; FRAME_LEN];

/// A transmitter that sends a whole buffer in the background.
pub trait Transmit: Sized {
    type Transfer: Pending<Self>;

    /// Start sending `buffer`.
    fn start(self, buffer: FrameBuffer) -> Self::Transfer;
}

/// A transfer in flight.
pub trait Pending<T> {
    fn is_done(&self) -> bool;

    /// Hand back the buffer and the transmitter. Only called once `is_done()` holds.
    fn finish(self) -> (FrameBuffer, T);
}

enum LinkState<T: Transmit> {
    Idle(T, FrameBuffer),
    Busy(T::Transfer),
}

/// [FrameSink] over a background transmitter. The buffer is never touched while a
/// transfer is in flight.
pub struct Link<T: Transmit> {
    // Only empty while `send` moves the state.
    state: Option<LinkState<T>>,
}

impl<T: Transmit> Link<T> {
    pub fn new(tx: T, buffer: FrameBuffer) -> Self {
        Self {
            state: Some(LinkState::Idle(tx, buffer)),
        }
    }
}

impl<T: Transmit> FrameSink for Link<T> {
    fn send(&mut self, frame: &Frame) -> Result<(), Busy> {
        let (tx, buffer) = match self.state.take() {
            Some(LinkState::Idle(tx, buffer)) => (tx, buffer),
            Some(LinkState::Busy(transfer)) if transfer.is_done() => {
                let (buffer, tx) = transfer.finish();
                (tx, buffer)
            }
            busy => {
                self.state = busy;
                return Err(Busy);
            }
        };
        *buffer = *frame.as_bytes();
        self.state = Some(LinkState::Busy(tx.start(buffer)));
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Sent,
    /// The sink was busy and the frame was discarded.
    Dropped,
    /// The scan buffer is not stable yet.
    Withheld,
}

pub struct Framer {
    layout: Layout,
    gate: bool,
    sent: u32,
    dropped: u32,
    withheld: u32,
}

impl Framer {
    /// # Args
    /// * `layout` - Byte order of the channel values.
    /// * `gate` - Withhold frames until the scan buffer is stable.
    pub fn new(layout: Layout, gate: bool) -> Self {
        Self {
            layout,
            gate,
            sent: 0,
            dropped: 0,
            withheld: 0,
        }
    }

    /// Build a frame from the latest samples and hand it to `sink`.
    pub fn publish<S: FrameSink>(
        &mut self,
        sink: &mut S,
        data: &[i32; 4],
        stable: bool,
    ) -> Outcome {
        if self.gate && !stable {
            self.withheld = self.withheld.wrapping_add(1);
            return Outcome::Withheld;
        }
        match sink.send(&Frame::build(data, self.layout)) {
            Ok(()) => {
                self.sent = self.sent.wrapping_add(1);
                Outcome::Sent
            }
            Err(Busy) => {
                self.dropped = self.dropped.wrapping_add(1);
                warn!("Transmitter busy, frame dropped ({} total)", self.dropped);
                Outcome::Dropped
            }
        }
    }

    pub fn sent(&self) -> u32 {
        self.sent
    }

    pub fn dropped(&self) -> u32 {
        self.dropped
    }

    pub fn withheld(&self) -> u32 {
        self.withheld
    }
}
