//! Columnar encoding: Arrow blocks serialized as IPC streams

use std::sync::Arc;

use arrow::array::{
    ArrayRef, BooleanBuilder, Float32Builder, Float64Builder, Int32Builder, Int64Builder,
    StringBuilder,
};
use arrow::datatypes::Schema as ArrowSchema;
use arrow::error::ArrowError;
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use serde_json::Value;

use crate::observability::{log_event, Event, Logger};
use crate::schema::{FieldType, Row, SchemaRef};

use super::frame::{EncodingMode, Frame};
use super::sink::FrameSink;
use super::{canonical_row, EncodeError, EncodeResult, RowEncoder};

const MAX_PREALLOCATED_ROWS: usize = 1024;

/// Typed builder for one output column
#[derive(Debug)]
enum ColumnBuilder {
    Boolean(BooleanBuilder),
    Int(Int32Builder),
    BigInt(Int64Builder),
    Float(Float32Builder),
    Double(Float64Builder),
    String(StringBuilder),
}

impl ColumnBuilder {
    fn for_type(field_type: FieldType, capacity: usize) -> Self {
        match field_type {
            FieldType::Boolean => ColumnBuilder::Boolean(BooleanBuilder::with_capacity(capacity)),
            FieldType::Int => ColumnBuilder::Int(Int32Builder::with_capacity(capacity)),
            FieldType::BigInt => ColumnBuilder::BigInt(Int64Builder::with_capacity(capacity)),
            FieldType::Float => ColumnBuilder::Float(Float32Builder::with_capacity(capacity)),
            FieldType::Double => ColumnBuilder::Double(Float64Builder::with_capacity(capacity)),
            FieldType::String => {
                ColumnBuilder::String(StringBuilder::with_capacity(capacity, capacity * 8))
            }
        }
    }

    /// Appends a canonical value. Returns `None` if the value does not fit.
    fn append(&mut self, value: &Value) -> Option<()> {
        if value.is_null() {
            match self {
                ColumnBuilder::Boolean(b) => b.append_null(),
                ColumnBuilder::Int(b) => b.append_null(),
                ColumnBuilder::BigInt(b) => b.append_null(),
                ColumnBuilder::Float(b) => b.append_null(),
                ColumnBuilder::Double(b) => b.append_null(),
                ColumnBuilder::String(b) => b.append_null(),
            }
            return Some(());
        }
        match self {
            ColumnBuilder::Boolean(b) => b.append_value(value.as_bool()?),
            ColumnBuilder::Int(b) => b.append_value(i32::try_from(value.as_i64()?).ok()?),
            ColumnBuilder::BigInt(b) => b.append_value(value.as_i64()?),
            ColumnBuilder::Float(b) => b.append_value(value.as_f64()? as f32),
            ColumnBuilder::Double(b) => b.append_value(value.as_f64()?),
            ColumnBuilder::String(b) => b.append_value(value.as_str()?),
        }
        Some(())
    }

    /// Builds the column and resets the builder
    fn finish(&mut self) -> ArrayRef {
        match self {
            ColumnBuilder::Boolean(b) => Arc::new(b.finish()),
            ColumnBuilder::Int(b) => Arc::new(b.finish()),
            ColumnBuilder::BigInt(b) => Arc::new(b.finish()),
            ColumnBuilder::Float(b) => Arc::new(b.finish()),
            ColumnBuilder::Double(b) => Arc::new(b.finish()),
            ColumnBuilder::String(b) => Arc::new(b.finish()),
        }
    }
}

/// Accumulates rows into Arrow blocks of at most `batch_size` rows
#[derive(Debug)]
pub struct ColumnarEncoder {
    schema: SchemaRef,
    arrow_schema: Arc<ArrowSchema>,
    columns: Vec<ColumnBuilder>,
    batch_size: usize,
    buffered: usize,
}

impl ColumnarEncoder {
    pub fn new(schema: SchemaRef, batch_size: usize) -> Self {
        let batch_size = batch_size.max(1);
        let capacity = batch_size.min(MAX_PREALLOCATED_ROWS);
        let columns = schema
            .fields()
            .iter()
            .map(|f| ColumnBuilder::for_type(f.field_type, capacity))
            .collect();
        Self {
            arrow_schema: Arc::new(schema.to_arrow()),
            schema,
            columns,
            batch_size,
            buffered: 0,
        }
    }

    /// Maximum rows per emitted block
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    fn take_batch(&mut self) -> Result<RecordBatch, ArrowError> {
        let rows = std::mem::take(&mut self.buffered);
        let arrays: Vec<ArrayRef> = self.columns.iter_mut().map(ColumnBuilder::finish).collect();
        let options = RecordBatchOptions::new().with_row_count(Some(rows));
        RecordBatch::try_new_with_options(Arc::clone(&self.arrow_schema), arrays, &options)
    }
}

impl RowEncoder for ColumnarEncoder {
    fn mode(&self) -> EncodingMode {
        EncodingMode::Arrow
    }

    fn encode(&mut self, row: Row, sink: &mut dyn FrameSink) -> EncodeResult<()> {
        // All values are checked before any builder is touched so the
        // columns never drift apart.
        let row = canonical_row(&self.schema, row)?;
        for (index, (column, value)) in self.columns.iter_mut().zip(row.iter()).enumerate() {
            column.append(value).ok_or_else(|| EncodeError::NotCanonical {
                index,
                declared: self.schema.fields()[index].field_type,
            })?;
        }
        self.buffered += 1;

        if self.buffered >= self.batch_size {
            self.flush(sink)?;
        }
        Ok(())
    }

    fn flush(&mut self, sink: &mut dyn FrameSink) -> EncodeResult<()> {
        if self.buffered == 0 {
            return Ok(());
        }
        let batch = self.take_batch()?;
        let rows = batch.num_rows();
        let ipc = write_ipc(&batch)?;

        let rows_str = rows.to_string();
        let bytes_str = ipc.len().to_string();
        Logger::trace(
            Event::BatchEmitted.as_str(),
            &[("bytes", bytes_str.as_str()), ("rows", rows_str.as_str())],
        );

        sink.send(Frame::Batch { rows, ipc })?;
        Ok(())
    }

    fn discard(&mut self) -> usize {
        let dropped = std::mem::take(&mut self.buffered);
        for column in self.columns.iter_mut() {
            drop(column.finish());
        }
        if dropped > 0 {
            let rows = dropped.to_string();
            log_event(Event::BatchDiscarded, &[("rows", rows.as_str())]);
        }
        dropped
    }

    fn buffered(&self) -> usize {
        self.buffered
    }
}

/// Serializes one batch as a self-contained IPC stream
fn write_ipc(batch: &RecordBatch) -> Result<Vec<u8>, ArrowError> {
    let mut buffer = Vec::new();
    {
        let schema = batch.schema();
        let mut writer = StreamWriter::try_new(&mut buffer, schema.as_ref())?;
        writer.write(batch)?;
        writer.finish()?;
    }
    Ok(buffer)
}
