//! Observable events
//!
//! Events are explicit and typed. The string form is what appears in the
//! `event` key of a log line.

use std::fmt;

/// Observable events of the table-function engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Registration
    /// Function registered
    Registered,
    /// Function removed from the registry
    Unregistered,

    // Execution
    /// A query over one or more partitions begins
    QueryBegin,
    /// All partitions finished
    QueryComplete,
    /// Output block emitted by the columnar encoder
    BatchEmitted,
    /// Partial block released without being emitted
    BatchDiscarded,

    // Failures
    /// A produced row did not match the schema
    SchemaMismatch,
    /// A return-type descriptor was rejected
    InvalidReturnType,
    /// The routine raised
    RoutineFailed,
    /// Encoding or writing output failed
    EncodeFailed,
    /// Execution was cancelled
    Cancelled,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::Registered => "UDTF_REGISTERED",
            Event::Unregistered => "UDTF_UNREGISTERED",
            Event::QueryBegin => "UDTF_QUERY_BEGIN",
            Event::QueryComplete => "UDTF_QUERY_COMPLETE",
            Event::BatchEmitted => "UDTF_BATCH_EMITTED",
            Event::BatchDiscarded => "UDTF_BATCH_DISCARDED",
            Event::SchemaMismatch => "UDTF_SCHEMA_MISMATCH",
            Event::InvalidReturnType => "UDTF_INVALID_RETURN_TYPE",
            Event::RoutineFailed => "UDTF_ROUTINE_FAILED",
            Event::EncodeFailed => "UDTF_ENCODE_FAILED",
            Event::Cancelled => "UDTF_CANCELLED",
        }
    }

    /// Returns true if this event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::SchemaMismatch
                | Event::InvalidReturnType
                | Event::RoutineFailed
                | Event::EncodeFailed
                | Event::Cancelled
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
