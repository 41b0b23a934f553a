//! Reader frame types

use serde::Serialize;

use crate::{Result, TimingError};

/// Header byte of a checkpoint-pass frame
pub const CHECKPOINT_HEADER: u8 = 0x02;

/// Total length of a checkpoint-pass frame, checksum included
pub const CHECKPOINT_FRAME_LEN: usize = 12;

/// Header byte of a telemetry frame
pub const TELEMETRY_HEADER: u8 = 0x01;

/// Total length of a telemetry frame, checksum included
pub const TELEMETRY_FRAME_LEN: usize = 8;

/// Frame classification, decided by the header byte alone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FrameKind {
    /// `0x02`: a transponder card passed the antenna
    Checkpoint,
    /// `0x01`: reader voltage, current and temperature
    Telemetry,
}

impl FrameKind {
    /// Classify a header byte. Any other value is not a frame start.
    pub fn from_header(header: u8) -> Option<Self> {
        match header {
            CHECKPOINT_HEADER => Some(FrameKind::Checkpoint),
            TELEMETRY_HEADER => Some(FrameKind::Telemetry),
            _ => None,
        }
    }

    /// Header byte for this kind
    pub fn header(self) -> u8 {
        match self {
            FrameKind::Checkpoint => CHECKPOINT_HEADER,
            FrameKind::Telemetry => TELEMETRY_HEADER,
        }
    }

    /// Fixed wire length for this kind
    pub fn frame_len(self) -> usize {
        match self {
            FrameKind::Checkpoint => CHECKPOINT_FRAME_LEN,
            FrameKind::Telemetry => TELEMETRY_FRAME_LEN,
        }
    }
}

/// One complete, fixed-length reader transmission.
///
/// A `Frame` always holds exactly `kind.frame_len()` bytes starting with the kind's
/// header byte. Its checksum has not necessarily been verified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Frame {
    kind: FrameKind,
    bytes: Box<[u8]>,
}

impl Frame {
    /// Build a frame from raw bytes, checking header and length.
    pub fn new(bytes: impl Into<Box<[u8]>>) -> Result<Self> {
        let bytes = bytes.into();
        let header = bytes.first().copied().unwrap_or_default();
        let kind = FrameKind::from_header(header).ok_or(TimingError::MalformedFrame {
            header,
            expected: 0,
            actual: bytes.len(),
        })?;

        if bytes.len() != kind.frame_len() {
            return Err(TimingError::MalformedFrame {
                header,
                expected: kind.frame_len(),
                actual: bytes.len(),
            });
        }

        Ok(Self { kind, bytes })
    }

    /// Header and length already known to match `kind`.
    pub(crate) fn from_parts(kind: FrameKind, bytes: Box<[u8]>) -> Self {
        debug_assert_eq!(bytes.len(), kind.frame_len());
        debug_assert_eq!(bytes.first(), Some(&kind.header()));
        Self { kind, bytes }
    }

    pub fn kind(&self) -> FrameKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The trailing checksum byte as carried on the wire
    pub fn checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }

    /// Everything except the trailing checksum byte
    pub fn body(&self) -> &[u8] {
        &self.bytes[..self.bytes.len() - 1]
    }

    /// Upper-case hex without separators, as written to the frame log
    pub fn to_hex(&self) -> String {
        hex::encode_upper(&self.bytes)
    }

    /// Upper-case hex with one space between bytes
    pub fn to_spaced_hex(&self) -> String {
        self.bytes.iter().map(|b| format!("{b:02X}")).collect::<Vec<_>>().join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_classification() {
        assert_eq!(FrameKind::from_header(0x02), Some(FrameKind::Checkpoint));
        assert_eq!(FrameKind::from_header(0x01), Some(FrameKind::Telemetry));
        assert_eq!(FrameKind::from_header(0x00), None);
        assert_eq!(FrameKind::from_header(0xFF), None);
        assert_eq!(FrameKind::Checkpoint.frame_len(), 12);
        assert_eq!(FrameKind::Telemetry.frame_len(), 8);
    }

    #[test]
    fn frame_rejects_wrong_length() {
        let err = Frame::new(vec![0x02, 0x00, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            TimingError::MalformedFrame { header: 0x02, expected: 12, actual: 3 }
        ));

        assert!(Frame::new(vec![0x01; 12]).is_err());
        assert!(Frame::new(Vec::new()).is_err());
        assert!(Frame::new(vec![0x7E; 12]).is_err());
    }

    #[test]
    fn frame_accessors() {
        let frame = Frame::new(vec![0x01, 0x00, 0xEA, 0x00, 0x32, 0x00, 0x19, 0xE6]).unwrap();
        assert_eq!(frame.kind(), FrameKind::Telemetry);
        assert_eq!(frame.checksum(), 0xE6);
        assert_eq!(frame.body().len(), 7);
        assert_eq!(frame.to_hex(), "0100EA00320019E6");
        assert_eq!(frame.to_spaced_hex(), "01 00 EA 00 32 00 19 E6");
    }
}
