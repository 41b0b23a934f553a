//! XOR checksum validation
//!
//! Every reader frame ends with one checksum byte: the XOR of all bytes
//! before it. That catches any single-bit error, but two flips in the same bit
//! position of different bytes cancel out and pass. The protocol has no other
//! redundancy, so a failing frame is dropped, never repaired.

use crate::types::Frame;
use crate::{Result, TimingError};

/// XOR of every byte in `bytes`
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, b| acc ^ b)
}

/// Append the checksum byte for `body`, producing a wire-ready frame.
pub fn seal(mut body: Vec<u8>) -> Vec<u8> {
    body.push(xor_checksum(&body));
    body
}

impl Frame {
    /// Whether the trailing byte matches the XOR of the rest of the frame
    pub fn is_valid(&self) -> bool {
        xor_checksum(self.body()) == self.checksum()
    }

    /// Like [`Frame::is_valid`], reporting both values on mismatch.
    pub fn verify(&self) -> Result<()> {
        let computed = xor_checksum(self.body());
        let carried = self.checksum();
        if computed == carried {
            Ok(())
        } else {
            Err(TimingError::Checksum { carried, computed })
        }
    }
}
