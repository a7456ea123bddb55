//! Frame layout on the wire.
//!
//! ```text
//! [SYNC_BYTE = 0xAA][sample 0: f32 LE] .. [sample 99: f32 LE]
//! ```
//!
//! Samples are spread with the PN sequence before serialization. There is no length field
//! and no checksum; a frame is always [`FRAME_SIZE`] bytes long.

use crate::pn::PnSequence;
use crate::{FRAME_SIZE, SAMPLE_SIZE, SIGNAL_LENGTH, SYNC_BYTE};

/// Outgoing frame buffer.
///
/// The buffer is rebuilt from scratch by every call to [`Frame::encode()`] and sent as one
/// unit, so a retransmission is always byte-identical to the first attempt.
#[allow(missing_copy_implementations)]
#[derive(Clone, PartialEq)]
pub struct Frame {
    buf: [u8; FRAME_SIZE],
}

impl Frame {
    /// Creates an all-zero frame that only carries the sync byte.
    pub const fn new() -> Self {
        let mut buf = [0; FRAME_SIZE];
        buf[0] = SYNC_BYTE;
        Frame { buf }
    }

    /// Spreads `signal` with `pn` into the frame buffer.
    pub fn encode(&mut self, signal: &[f32; SIGNAL_LENGTH], pn: &PnSequence) {
        self.buf[0] = SYNC_BYTE;
        for (chunk, sample) in self.buf[1..]
            .chunks_exact_mut(SAMPLE_SIZE)
            .zip(pn.spread(signal))
        {
            chunk.copy_from_slice(&sample.to_le_bytes());
        }
    }

    /// Returns the full frame, sync byte included.
    pub fn as_bytes(&self) -> &[u8; FRAME_SIZE] {
        &self.buf
    }

    /// Returns the serialized samples without the sync byte.
    pub fn payload(&self) -> &[u8] {
        &self.buf[1..]
    }
}

impl Default for Frame {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Frame {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Frame")
            .field("sync", &self.buf[0])
            .field("payload", &self.payload())
            .finish()
    }
}

/// Read-only view over a received frame.
///
/// Only checks the layout. Despreading is up to the receiver.
#[derive(Debug, Copy, Clone)]
pub struct FrameView<'a> {
    payload: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// Wraps `bytes` if it has the length of a frame and starts with [`SYNC_BYTE`].
    ///
    /// # Examples
    /// ```rust
    /// use spread_hop::frame::{Frame, FrameView};
    ///
    /// let frame = Frame::new();
    /// let view = FrameView::parse(frame.as_bytes()).unwrap();
    /// assert!(view.samples().all(|s| s == 0.0));
    /// ```
    pub fn parse(bytes: &'a [u8]) -> Option<Self> {
        match bytes.split_first() {
            Some((&SYNC_BYTE, payload)) if payload.len() == SIGNAL_LENGTH * SAMPLE_SIZE => {
                Some(FrameView { payload })
            }
            _ => None,
        }
    }

    /// Returns an iterator over the spread samples carried by the frame.
    pub fn samples(&self) -> impl Iterator<Item = f32> + 'a {
        let payload = self.payload;
        payload.chunks_exact(SAMPLE_SIZE).map(|c| {
            let mut b = [0; SAMPLE_SIZE];
            b.copy_from_slice(c);
            f32::from_le_bytes(b)
        })
    }
}
