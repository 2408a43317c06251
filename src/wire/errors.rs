//! Wire framing errors

use std::io;

use thiserror::Error;

/// Failure to write or read a framed output stream
#[derive(Debug, Error)]
pub enum WireError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("frame truncated: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("frame checksum mismatch: computed {computed:08x}, stored {stored:08x}")]
    ChecksumMismatch { computed: u32, stored: u32 },

    #[error("unknown frame type {0}")]
    UnknownFrameType(u8),

    #[error("invalid frame length {0}")]
    InvalidLength(usize),

    #[error("invalid error payload: {0}")]
    Json(#[from] serde_json::Error),
}

impl WireError {
    /// Returns true if the stream is damaged rather than merely unreadable
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            WireError::Truncated { .. }
                | WireError::ChecksumMismatch { .. }
                | WireError::UnknownFrameType(_)
                | WireError::InvalidLength(_)
        )
    }
}

pub type WireResult<T> = Result<T, WireError>;
