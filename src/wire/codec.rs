//! Frame encoding
//!
//! Each frame on the wire:
//! - Frame Length (u32 LE), counting every byte of the frame
//! - Frame Type (u8): ROW / BATCH / ERROR
//! - Payload (variable)
//! - Checksum (u32 LE) over everything before it
//!
//! Payloads:
//! - ROW: the row's JSON array
//! - BATCH: row count (u64 LE) followed by the Arrow IPC stream
//! - ERROR: the structured error as JSON

use crate::encoder::Frame;
use crate::errors::StructuredError;

use super::checksum::compute_checksum;
use super::errors::{WireError, WireResult};

/// Length field + type byte
pub const HEADER_SIZE: usize = 4 + 1;
/// Trailing checksum
pub const CHECKSUM_SIZE: usize = 4;
/// Smallest valid frame (empty payload)
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + CHECKSUM_SIZE;
/// Largest frame accepted in either direction (256 MiB)
pub const MAX_FRAME_SIZE: usize = 256 * 1024 * 1024;

/// Frame type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameType {
    Row = 1,
    Batch = 2,
    Error = 3,
}

impl FrameType {
    /// Convert from u8, returns None for invalid values
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(FrameType::Row),
            2 => Some(FrameType::Batch),
            3 => Some(FrameType::Error),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn of(frame: &Frame) -> Self {
        match frame {
            Frame::Row(_) => FrameType::Row,
            Frame::Batch { .. } => FrameType::Batch,
            Frame::Error(_) => FrameType::Error,
        }
    }
}

fn payload(frame: &Frame) -> WireResult<Vec<u8>> {
    Ok(match frame {
        Frame::Row(bytes) => bytes.clone(),
        Frame::Batch { rows, ipc } => {
            let mut buf = Vec::with_capacity(8 + ipc.len());
            buf.extend_from_slice(&(*rows as u64).to_le_bytes());
            buf.extend_from_slice(ipc);
            buf
        }
        Frame::Error(err) => serde_json::to_vec(err)?,
    })
}

/// Serializes a frame with its length, type and checksum
pub fn encode_frame(frame: &Frame) -> WireResult<Vec<u8>> {
    let payload = payload(frame)?;
    let frame_length = MIN_FRAME_SIZE + payload.len();
    if frame_length > MAX_FRAME_SIZE {
        return Err(WireError::InvalidLength(frame_length));
    }
    let length_field =
        u32::try_from(frame_length).map_err(|_| WireError::InvalidLength(frame_length))?;

    let mut buf = Vec::with_capacity(frame_length);
    buf.extend_from_slice(&length_field.to_le_bytes());
    buf.push(FrameType::of(frame).as_u8());
    buf.extend_from_slice(&payload);
    let checksum = compute_checksum(&buf);
    buf.extend_from_slice(&checksum.to_le_bytes());
    Ok(buf)
}

/// Reads the length field of a frame starting at `data[0]`
pub fn frame_length(data: &[u8]) -> WireResult<usize> {
    if data.len() < 4 {
        return Err(WireError::Truncated {
            needed: 4,
            available: data.len(),
        });
    }
    let length = u32::from_le_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if !(MIN_FRAME_SIZE..=MAX_FRAME_SIZE).contains(&length) {
        return Err(WireError::InvalidLength(length));
    }
    Ok(length)
}

/// Decodes one frame from the start of `data`, verifying its checksum.
///
/// Returns the frame and the number of bytes consumed.
pub fn decode_frame(data: &[u8]) -> WireResult<(Frame, usize)> {
    let length = frame_length(data)?;
    if data.len() < length {
        return Err(WireError::Truncated {
            needed: length,
            available: data.len(),
        });
    }

    let checksum_offset = length - CHECKSUM_SIZE;
    let stored = u32::from_le_bytes([
        data[checksum_offset],
        data[checksum_offset + 1],
        data[checksum_offset + 2],
        data[checksum_offset + 3],
    ]);
    let computed = compute_checksum(&data[..checksum_offset]);
    if computed != stored {
        return Err(WireError::ChecksumMismatch { computed, stored });
    }

    let frame_type = FrameType::from_u8(data[4]).ok_or(WireError::UnknownFrameType(data[4]))?;
    let payload = &data[HEADER_SIZE..checksum_offset];
    let frame = match frame_type {
        FrameType::Row => Frame::Row(payload.to_vec()),
        FrameType::Batch => {
            if payload.len() < 8 {
                return Err(WireError::Truncated {
                    needed: 8,
                    available: payload.len(),
                });
            }
            let mut rows = [0u8; 8];
            rows.copy_from_slice(&payload[..8]);
            Frame::Batch {
                rows: u64::from_le_bytes(rows) as usize,
                ipc: payload[8..].to_vec(),
            }
        }
        FrameType::Error => {
            let err: StructuredError = serde_json::from_slice(payload)?;
            Frame::Error(err)
        }
    };
    Ok((frame, length))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_frame_layout() {
        let bytes = encode_frame(&Frame::Row(b"[1]".to_vec())).unwrap();
        assert_eq!(bytes.len(), MIN_FRAME_SIZE + 3);
        assert_eq!(frame_length(&bytes).unwrap(), bytes.len());
        assert_eq!(bytes[4], FrameType::Row.as_u8());
        assert_eq!(&bytes[5..8], b"[1]");
    }

    #[test]
    fn test_decode_consumes_one_frame() {
        let mut bytes = encode_frame(&Frame::Batch {
            rows: 2,
            ipc: vec![9, 9, 9],
        })
        .unwrap();
        let first_len = bytes.len();
        bytes.extend(encode_frame(&Frame::Row(b"[]".to_vec())).unwrap());

        let (frame, consumed) = decode_frame(&bytes).unwrap();
        assert_eq!(consumed, first_len);
        assert_eq!(frame.row_count(), 2);
    }

    #[test]
    fn test_error_frame_keeps_structured_error() {
        let err = StructuredError::arity_mismatch(2, 3);
        let bytes = encode_frame(&Frame::Error(err.clone())).unwrap();
        let (frame, _) = decode_frame(&bytes).unwrap();
        assert_eq!(frame.as_error(), Some(&err));
    }

    #[test]
    fn test_corrupted_payload_detected() {
        let mut bytes = encode_frame(&Frame::Row(b"[1,2]".to_vec())).unwrap();
        bytes[6] ^= 0xFF;
        assert!(matches!(
            decode_frame(&bytes),
            Err(WireError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_frame_detected() {
        let bytes = encode_frame(&Frame::Row(b"[1,2]".to_vec())).unwrap();
        let err = decode_frame(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_oversized_length_rejected() {
        let err = frame_length(&u32::MAX.to_le_bytes()).unwrap_err();
        assert!(matches!(err, WireError::InvalidLength(len) if len == u32::MAX as usize));

        let just_over = (MAX_FRAME_SIZE as u32 + 1).to_le_bytes();
        assert!(frame_length(&just_over).is_err());
        assert_eq!(
            frame_length(&(MAX_FRAME_SIZE as u32).to_le_bytes()).unwrap(),
            MAX_FRAME_SIZE
        );
    }
}
