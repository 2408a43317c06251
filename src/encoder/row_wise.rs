//! Row-wise encoding: one JSON array per frame

use crate::schema::{Row, SchemaRef};

use super::frame::{EncodingMode, Frame};
use super::sink::FrameSink;
use super::{canonical_row, EncodeResult, RowEncoder};

/// Emits every row as soon as it is accepted
#[derive(Debug, Clone)]
pub struct RowWiseEncoder {
    schema: SchemaRef,
}

impl RowWiseEncoder {
    pub fn new(schema: SchemaRef) -> Self {
        Self { schema }
    }
}

impl RowEncoder for RowWiseEncoder {
    fn mode(&self) -> EncodingMode {
        EncodingMode::Row
    }

    fn encode(&mut self, row: Row, sink: &mut dyn FrameSink) -> EncodeResult<()> {
        let row = canonical_row(&self.schema, row)?;
        let bytes = serde_json::to_vec(&row)?;
        sink.send(Frame::Row(bytes))?;
        Ok(())
    }

    fn flush(&mut self, _sink: &mut dyn FrameSink) -> EncodeResult<()> {
        Ok(())
    }

    fn discard(&mut self) -> usize {
        0
    }

    fn buffered(&self) -> usize {
        0
    }
}
