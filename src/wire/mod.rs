//! # Wire Framing
//!
//! Length-prefixed, checksummed framing of output streams so they can be
//! written to files or pipes and read back.
//!
//! # Guarantees
//!
//! - Every frame carries a CRC32 over its header and payload
//! - A checksum mismatch or partial frame is reported, never skipped

mod checksum;
mod codec;
mod errors;
mod stream;

pub use checksum::{compute_checksum, verify_checksum};
pub use codec::{decode_frame, encode_frame, FrameType, MAX_FRAME_SIZE, MIN_FRAME_SIZE};
pub use errors::{WireError, WireResult};
pub use stream::{FrameReader, FrameWriter};
