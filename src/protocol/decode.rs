//! Field decoding for validated frames

use serde::Serialize;

use crate::Result;
use crate::types::{Frame, FrameKind};

/// Card identifier reported when no transponder was actually read
pub const NO_CARD: u32 = 0;

/// Decoded `0x02` frame: a transponder passed the antenna.
///
/// | offset | field |
/// |---|---|
/// | 1 | address code |
/// | 2 | command code |
/// | 3 | declared length |
/// | 4-6 | card id (big-endian, 24 bit) |
/// | 7 | card voltage, tenths of a volt |
/// | 8-9 | sense id |
/// | 10 | signal strength |
/// | 11 | checksum |
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointFrame {
    pub address: u8,
    pub command: u8,
    pub length: u8,
    pub card_id: u32,
    pub voltage: f32,
    pub sense_id: u16,
    pub signal_strength: u8,
}

impl CheckpointFrame {
    /// Whether this frame carries a real card read
    pub fn has_card(&self) -> bool {
        self.card_id != NO_CARD
    }
}

/// Decoded `0x01` frame: reader telemetry.
///
/// Decoded for diagnostics only; it plays no part in scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryFrame {
    /// Volts, from a big-endian 16 bit value in tenths
    pub voltage: f32,
    /// Milliamps
    pub current_ma: u16,
    /// Degrees Celsius
    pub temperature_c: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DecodedFrame {
    Checkpoint(CheckpointFrame),
    Telemetry(TelemetryFrame),
}

/// Decode a frame, refusing it if the checksum does not match.
pub fn decode(frame: &Frame) -> Result<DecodedFrame> {
    frame.verify()?;
    let b = frame.as_bytes();

    let decoded = match frame.kind() {
        FrameKind::Checkpoint => DecodedFrame::Checkpoint(CheckpointFrame {
            address: b[1],
            command: b[2],
            length: b[3],
            card_id: u32::from_be_bytes([0, b[4], b[5], b[6]]),
            voltage: f32::from(b[7]) / 10.0,
            sense_id: u16::from_be_bytes([b[8], b[9]]),
            signal_strength: b[10],
        }),
        FrameKind::Telemetry => DecodedFrame::Telemetry(TelemetryFrame {
            voltage: f32::from(u16::from_be_bytes([b[1], b[2]])) / 10.0,
            current_ma: u16::from_be_bytes([b[3], b[4]]),
            temperature_c: decode_temperature(b[5], b[6]),
        }),
    };

    Ok(decoded)
}

/// The reader sends the magnitude in the low byte and marks negative values
/// with `0xFF` in the high byte.
fn decode_temperature(marker: u8, magnitude: u8) -> i16 {
    let value = i16::from(magnitude);
    if marker == 0xFF { -value } else { value }
}
