//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase
//! - Shared across partitions through `Arc`

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters of the engine
///
/// All counters use Relaxed ordering; readers only need eventual totals.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Input rows handed to `eval`
    input_rows: AtomicU64,
    /// Conforming rows handed to the encoder
    output_rows: AtomicU64,
    /// Frames written to sinks (rows, blocks and errors)
    frames_emitted: AtomicU64,
    /// Columnar blocks emitted
    batches_emitted: AtomicU64,
    /// Rows rejected by validation
    schema_mismatches: AtomicU64,
    /// Rejected return-type descriptors
    invalid_return_types: AtomicU64,
    /// Routine failures
    routine_failures: AtomicU64,
    /// Conforming rows that could not be encoded or written
    encode_failures: AtomicU64,
    /// Cancelled invocations
    cancellations: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_input_rows(&self) {
        self.input_rows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_output_rows(&self) {
        self.output_rows.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_frames(&self) {
        self.frames_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batches(&self) {
        self.batches_emitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_schema_mismatches(&self) {
        self.schema_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_invalid_return_types(&self) {
        self.invalid_return_types.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_routine_failures(&self) {
        self.routine_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_encode_failures(&self) {
        self.encode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_cancellations(&self) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn input_rows(&self) -> u64 {
        self.input_rows.load(Ordering::Relaxed)
    }

    pub fn output_rows(&self) -> u64 {
        self.output_rows.load(Ordering::Relaxed)
    }

    pub fn schema_mismatches(&self) -> u64 {
        self.schema_mismatches.load(Ordering::Relaxed)
    }

    pub fn invalid_return_types(&self) -> u64 {
        self.invalid_return_types.load(Ordering::Relaxed)
    }

    pub fn encode_failures(&self) -> u64 {
        self.encode_failures.load(Ordering::Relaxed)
    }

    pub fn cancellations(&self) -> u64 {
        self.cancellations.load(Ordering::Relaxed)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            input_rows: self.input_rows.load(Ordering::Relaxed),
            output_rows: self.output_rows.load(Ordering::Relaxed),
            frames_emitted: self.frames_emitted.load(Ordering::Relaxed),
            batches_emitted: self.batches_emitted.load(Ordering::Relaxed),
            schema_mismatches: self.schema_mismatches.load(Ordering::Relaxed),
            invalid_return_types: self.invalid_return_types.load(Ordering::Relaxed),
            routine_failures: self.routine_failures.load(Ordering::Relaxed),
            encode_failures: self.encode_failures.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
        }
    }

    /// Serializes the snapshot to JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MetricsSnapshot {
    pub input_rows: u64,
    pub output_rows: u64,
    pub frames_emitted: u64,
    pub batches_emitted: u64,
    pub schema_mismatches: u64,
    pub invalid_return_types: u64,
    pub routine_failures: u64,
    pub encode_failures: u64,
    pub cancellations: u64,
}
