//! Reading frames back into rows
//!
//! Used by the caller side of a query. Both encodings decode to the same
//! logical rows; an error frame ends the stream and surfaces as a
//! [`RemoteError`].

use std::io::Cursor;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{Float32Type, Float64Type, Int32Type, Int64Type};
use arrow::error::ArrowError;
use arrow::ipc::reader::StreamReader;
use serde_json::Value;
use thiserror::Error;

use crate::rpc::RemoteError;
use crate::schema::{FieldType, Row, SchemaRef};

use super::frame::Frame;

/// Failure to read an output stream
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed frame: {0}")]
    Malformed(String),

    #[error("{0}")]
    Remote(RemoteError),
}

impl DecodeError {
    /// Returns the remote error if the stream ended with an error frame
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            DecodeError::Remote(err) => Some(err),
            _ => None,
        }
    }
}

/// Rows received before the stream ended, and the error that ended it
#[derive(Debug, Default)]
pub struct PartialOutput {
    pub rows: Vec<Row>,
    pub error: Option<RemoteError>,
}

/// Decodes frames against a known schema
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    schema: SchemaRef,
}

impl FrameDecoder {
    pub fn new(schema: SchemaRef) -> Self {
        Self { schema }
    }

    /// Decodes one frame. Error frames are returned as [`DecodeError::Remote`].
    pub fn decode(&self, frame: &Frame) -> Result<Vec<Row>, DecodeError> {
        match frame {
            Frame::Row(bytes) => Ok(vec![self.decode_row(bytes)?]),
            Frame::Batch { rows, ipc } => self.decode_batch(*rows, ipc),
            Frame::Error(err) => Err(DecodeError::Remote(RemoteError::wrap(err))),
        }
    }

    /// Decodes a whole stream, failing on the first error frame
    pub fn collect<'a, I>(&self, frames: I) -> Result<Vec<Row>, DecodeError>
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        let mut rows = Vec::new();
        for frame in frames {
            rows.extend(self.decode(frame)?);
        }
        Ok(rows)
    }

    /// Decodes a stream, keeping the rows delivered before an error frame
    pub fn collect_partial<'a, I>(&self, frames: I) -> Result<PartialOutput, DecodeError>
    where
        I: IntoIterator<Item = &'a Frame>,
    {
        let mut output = PartialOutput::default();
        for frame in frames {
            match self.decode(frame) {
                Ok(rows) => output.rows.extend(rows),
                Err(DecodeError::Remote(err)) => {
                    output.error = Some(err);
                    break;
                }
                Err(err) => return Err(err),
            }
        }
        Ok(output)
    }

    fn decode_row(&self, bytes: &[u8]) -> Result<Row, DecodeError> {
        let row: Row = serde_json::from_slice(bytes)?;
        if row.len() != self.schema.field_count() {
            return Err(DecodeError::Malformed(format!(
                "row has {} values, schema has {} fields",
                row.len(),
                self.schema.field_count()
            )));
        }
        row.into_iter()
            .zip(self.schema.fields())
            .map(|(value, field)| {
                field.field_type.canonicalize(value).ok_or_else(|| {
                    DecodeError::Malformed(format!("value for '{}' is not {}", field.name, field.field_type))
                })
            })
            .collect()
    }

    /// Decodes a block. The declared row count is only checked against what
    /// the IPC stream actually carries, never used to size buffers.
    fn decode_batch(&self, expected: usize, ipc: &[u8]) -> Result<Vec<Row>, DecodeError> {
        let reader = StreamReader::try_new(Cursor::new(ipc), None)?;
        let mut rows = Vec::new();
        for batch in reader {
            let batch = batch?;
            if batch.num_columns() != self.schema.field_count() {
                return Err(DecodeError::Malformed(format!(
                    "batch has {} columns, schema has {} fields",
                    batch.num_columns(),
                    self.schema.field_count()
                )));
            }
            for i in 0..batch.num_rows() {
                let row = batch
                    .columns()
                    .iter()
                    .zip(self.schema.fields())
                    .map(|(column, field)| value_at(column, i, field.field_type))
                    .collect::<Result<Row, DecodeError>>()?;
                rows.push(row);
            }
        }

        if rows.len() != expected {
            return Err(DecodeError::Malformed(format!(
                "batch declared {} rows, carried {}",
                expected,
                rows.len()
            )));
        }
        Ok(rows)
    }
}

fn value_at(column: &ArrayRef, i: usize, field_type: FieldType) -> Result<Value, DecodeError> {
    if column.is_null(i) {
        return Ok(Value::Null);
    }
    let mismatch = || {
        DecodeError::Malformed(format!(
            "column of type {} does not hold {}",
            column.data_type(),
            field_type
        ))
    };
    let value = match field_type {
        FieldType::Boolean => Value::Bool(column.as_boolean_opt().ok_or_else(mismatch)?.value(i)),
        FieldType::Int => Value::from(
            column
                .as_primitive_opt::<Int32Type>()
                .ok_or_else(mismatch)?
                .value(i),
        ),
        FieldType::BigInt => Value::from(
            column
                .as_primitive_opt::<Int64Type>()
                .ok_or_else(mismatch)?
                .value(i),
        ),
        FieldType::Float => Value::from(f64::from(
            column
                .as_primitive_opt::<Float32Type>()
                .ok_or_else(mismatch)?
                .value(i),
        )),
        FieldType::Double => Value::from(
            column
                .as_primitive_opt::<Float64Type>()
                .ok_or_else(mismatch)?
                .value(i),
        ),
        FieldType::String => Value::from(column.as_string_opt::<i32>().ok_or_else(mismatch)?.value(i)),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{ColumnarEncoder, RowEncoder, RowWiseEncoder, VecSink};
    use crate::errors::{ErrorKind, StructuredError};
    use crate::schema::parse_return_type;
    use serde_json::json;
    use std::sync::Arc;

    fn schema() -> SchemaRef {
        parse_return_type("a: int, b: string, c: float, d: boolean")
            .unwrap()
            .into_ref()
    }

    fn rows() -> Vec<Row> {
        vec![
            vec![json!(1), json!("one"), json!(0.1), json!(true)],
            vec![json!(null), json!(null), json!(null), json!(null)],
            vec![json!(-7), json!(""), json!(2.5), json!(false)],
        ]
    }

    fn encode_all(encoder: &mut dyn RowEncoder) -> Vec<Frame> {
        let mut sink = VecSink::new();
        for row in rows() {
            encoder.encode(row, &mut sink).unwrap();
        }
        encoder.flush(&mut sink).unwrap();
        sink.into_frames()
    }

    #[test]
    fn test_both_modes_decode_to_same_rows() {
        let decoder = FrameDecoder::new(schema());
        let by_row = decoder
            .collect(&encode_all(&mut RowWiseEncoder::new(schema())))
            .unwrap();
        let by_batch = decoder
            .collect(&encode_all(&mut ColumnarEncoder::new(schema(), 2)))
            .unwrap();
        assert_eq!(by_row, by_batch);
        assert_eq!(by_row[0][2], json!(f64::from(0.1f32)));
    }

    #[test]
    fn test_error_frame_keeps_prior_rows() {
        let decoder = FrameDecoder::new(schema());
        let mut frames = encode_all(&mut RowWiseEncoder::new(schema()));
        frames.push(Frame::Error(StructuredError::arity_mismatch(4, 1)));

        let partial = decoder.collect_partial(&frames).unwrap();
        assert_eq!(partial.rows.len(), 3);
        assert_eq!(
            partial.error.unwrap().kind(),
            Some(ErrorKind::ReturnSchemaMismatch)
        );

        let err = decoder.collect(&frames).unwrap_err();
        assert!(err.remote().is_some());
    }

    fn single_block(schema: SchemaRef, row: Row) -> (usize, Vec<u8>) {
        let mut encoder = ColumnarEncoder::new(schema, 10);
        let mut sink = VecSink::new();
        encoder.encode(row, &mut sink).unwrap();
        encoder.flush(&mut sink).unwrap();
        match sink.into_frames().remove(0) {
            Frame::Batch { rows, ipc } => (rows, ipc),
            other => panic!("expected a batch, got {:?}", other),
        }
    }

    #[test]
    fn test_overstated_row_count_is_malformed() {
        let decoder = FrameDecoder::new(schema());
        let (rows, ipc) = single_block(schema(), self::rows().remove(0));
        assert_eq!(rows, 1);

        let err = decoder
            .decode(&Frame::Batch { rows: usize::MAX, ipc })
            .unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_zero_field_row_count_comes_from_block() {
        let empty = parse_return_type("struct<>").unwrap().into_ref();
        let decoder = FrameDecoder::new(Arc::clone(&empty));
        let (rows, ipc) = single_block(Arc::clone(&empty), Vec::new());
        assert_eq!(
            decoder.decode(&Frame::Batch { rows, ipc: ipc.clone() }).unwrap(),
            vec![Vec::<Value>::new()]
        );

        let err = decoder
            .decode(&Frame::Batch { rows: usize::MAX, ipc })
            .unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }

    #[test]
    fn test_row_frame_with_wrong_arity_is_malformed() {
        let decoder = FrameDecoder::new(schema());
        let err = decoder.decode(&Frame::Row(b"[1]".to_vec())).unwrap_err();
        assert!(matches!(err, DecodeError::Malformed(_)));
    }
}
