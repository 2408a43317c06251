//! Output frames
//!
//! A frame is one unit of the output stream. Row and batch frames carry
//! already-serialized payloads; error frames carry the structured error that
//! ended the stream.

use serde::{Deserialize, Serialize};

use crate::errors::StructuredError;

/// Serialization strategy for a whole query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingMode {
    /// One JSON array per row
    #[default]
    Row,
    /// Arrow IPC blocks of up to `arrow_batch_size` rows
    Arrow,
}

impl EncodingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodingMode::Row => "row",
            EncodingMode::Arrow => "arrow",
        }
    }
}

/// One unit of the output stream
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// One row, as a JSON array
    Row(Vec<u8>),
    /// A columnar block, as an Arrow IPC stream
    Batch { rows: usize, ipc: Vec<u8> },
    /// Terminal failure
    Error(StructuredError),
}

impl Frame {
    /// Encoding mode of a data frame; `None` for error frames
    pub fn mode(&self) -> Option<EncodingMode> {
        match self {
            Frame::Row(_) => Some(EncodingMode::Row),
            Frame::Batch { .. } => Some(EncodingMode::Arrow),
            Frame::Error(_) => None,
        }
    }

    /// Number of logical rows carried
    pub fn row_count(&self) -> usize {
        match self {
            Frame::Row(_) => 1,
            Frame::Batch { rows, .. } => *rows,
            Frame::Error(_) => 0,
        }
    }

    /// Returns the error if this is an error frame
    pub fn as_error(&self) -> Option<&StructuredError> {
        match self {
            Frame::Error(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_mode_tags() {
        assert_eq!(Frame::Row(b"[1]".to_vec()).mode(), Some(EncodingMode::Row));
        assert_eq!(
            Frame::Batch { rows: 3, ipc: vec![] }.mode(),
            Some(EncodingMode::Arrow)
        );
        let err = Frame::Error(StructuredError::arity_mismatch(1, 2));
        assert_eq!(err.mode(), None);
        assert_eq!(err.row_count(), 0);
        assert!(err.as_error().is_some());
    }

    #[test]
    fn test_mode_serde() {
        let mode: EncodingMode = serde_json::from_str("\"arrow\"").unwrap();
        assert_eq!(mode, EncodingMode::Arrow);
        assert_eq!(EncodingMode::default(), EncodingMode::Row);
    }
}
