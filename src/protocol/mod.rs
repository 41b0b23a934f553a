//! Reader wire protocol: reassembly, checksum validation and decoding.
//!
//! The reader writes two fixed-length frame types onto the serial line with no
//! framing beyond the header byte:
//!
//! | Header | Length | Contents |
//! |---|---|---|
//! | `0x02` | 12 | checkpoint pass: card id, card voltage, signal strength |
//! | `0x01` | 8 | reader telemetry: voltage, current, temperature |
//!
//! Both end in an XOR checksum of the preceding bytes.
//!
//! ```rust
//! use lapgate::protocol::{DecodedFrame, FrameReassembler, decode, seal};
//!
//! let frame = seal(vec![0x02, 0x01, 0x41, 0x08, 0x00, 0x30, 0x39, 0x1E, 0x00, 0x01, 0x50]);
//! let mut stream = vec![0xFF, 0xFF];
//! stream.extend(&frame);
//!
//! let mut reassembler = FrameReassembler::new();
//! let frames = reassembler.push(&stream);
//! assert_eq!(frames.len(), 1);
//!
//! match decode(&frames[0]).unwrap() {
//!     DecodedFrame::Checkpoint(cp) => assert_eq!(cp.card_id, 12345),
//!     DecodedFrame::Telemetry(_) => unreachable!(),
//! }
//! ```

pub mod checksum;
pub mod decode;
pub mod reassembler;

pub use checksum::{seal, xor_checksum};
pub use decode::{CheckpointFrame, DecodedFrame, NO_CARD, TelemetryFrame, decode};
pub use reassembler::FrameReassembler;
