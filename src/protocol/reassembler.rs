//! Stream-to-frame reassembly

use std::collections::VecDeque;
use tracing::trace;

use crate::types::{Frame, FrameKind};

/// Rebuilds fixed-length frames from arbitrarily chunked serial bytes.
///
/// Bytes that cannot start a frame are dropped one at a time, which is how the
/// reassembler finds its way back after noise, dropped bytes or attaching in
/// the middle of a transmission. An incomplete frame at the end of a chunk is
/// kept until more bytes arrive; it is never discarded.
#[derive(Debug, Default)]
pub struct FrameReassembler {
    pending: VecDeque<u8>,
    frames_emitted: u64,
    bytes_discarded: u64,
}

impl FrameReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and extract every frame that is now complete, in stream
    /// order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.pending.extend(chunk);

        let mut frames = Vec::new();
        while let Some(&header) = self.pending.front() {
            let Some(kind) = FrameKind::from_header(header) else {
                self.pending.pop_front();
                self.bytes_discarded += 1;
                trace!(byte = header, "discarded junk byte");
                continue;
            };

            if self.pending.len() < kind.frame_len() {
                break;
            }

            let bytes: Vec<u8> = self.pending.drain(..kind.frame_len()).collect();
            self.frames_emitted += 1;
            frames.push(Frame::from_parts(kind, bytes.into_boxed_slice()));
        }

        frames
    }

    /// Bytes held back waiting for the rest of a frame
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    pub fn bytes_discarded(&self) -> u64 {
        self.bytes_discarded
    }

    /// Drop any partially received frame.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
