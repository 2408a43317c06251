//! # Row Encoders
//!
//! Turns validated rows into output frames. The mode is fixed per query:
//! row-wise emits one frame per row, columnar accumulates rows into Arrow
//! blocks and emits a block when it is full or when the stream ends.
//!
//! Encoders never see a row that failed validation. Anything they buffer is
//! either flushed on normal completion or on failure, or discarded on
//! cancellation.

mod columnar;
mod decode;
mod frame;
mod row_wise;
mod sink;

use arrow::error::ArrowError;
use thiserror::Error;

use crate::schema::{FieldType, Row, RowSchema, SchemaRef};

pub use columnar::ColumnarEncoder;
pub use decode::{DecodeError, FrameDecoder, PartialOutput};
pub use frame::{EncodingMode, Frame};
pub use row_wise::RowWiseEncoder;
pub use sink::{ChannelSink, FrameSink, SinkError, VecSink};

/// Failure to encode or write a validated row
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("value at index {index} has no canonical {declared} form")]
    NotCanonical { index: usize, declared: FieldType },

    #[error("{0}")]
    Sink(#[from] SinkError),
}

impl EncodeError {
    /// Returns true if the receiver went away
    pub fn is_disconnect(&self) -> bool {
        matches!(self, EncodeError::Sink(SinkError::Closed))
    }
}

pub type EncodeResult<T> = Result<T, EncodeError>;

/// Serializes validated rows into frames
pub trait RowEncoder: Send {
    /// Encoding mode of emitted frames
    fn mode(&self) -> EncodingMode;

    /// Accepts one validated row, emitting zero or more frames
    fn encode(&mut self, row: Row, sink: &mut dyn FrameSink) -> EncodeResult<()>;

    /// Emits everything still buffered
    fn flush(&mut self, sink: &mut dyn FrameSink) -> EncodeResult<()>;

    /// Drops everything still buffered, returning the number of rows lost
    fn discard(&mut self) -> usize;

    /// Rows accepted but not yet emitted
    fn buffered(&self) -> usize;
}

/// Creates the encoder for a query
pub fn new_encoder(
    mode: EncodingMode,
    schema: SchemaRef,
    arrow_batch_size: usize,
) -> Box<dyn RowEncoder> {
    match mode {
        EncodingMode::Row => Box::new(RowWiseEncoder::new(schema)),
        EncodingMode::Arrow => Box::new(ColumnarEncoder::new(schema, arrow_batch_size)),
    }
}

/// Brings every value of a validated row into its canonical form.
pub(crate) fn canonical_row(schema: &RowSchema, row: Row) -> EncodeResult<Row> {
    row.into_iter()
        .zip(schema.fields())
        .enumerate()
        .map(|(index, (value, field))| {
            field
                .field_type
                .canonicalize(value)
                .ok_or_else(|| EncodeError::NotCanonical {
                    index,
                    declared: field.field_type,
                })
        })
        .collect()
}
