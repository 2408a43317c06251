//! Structured error type carried across the RPC boundary
//!
//! Error codes:
//! - UDTF_RETURN_SCHEMA_MISMATCH (ERROR)
//! - INVALID_UDTF_RETURN_TYPE (ERROR)
//! - UDTF_EXEC_ERROR (ERROR)
//! - UDTF_ENCODE_FAILED (ERROR)
//! - UDTF_CANCELLED (ERROR)
//! - UDTF_NOT_FOUND (ERROR)
//! - UDTF_ALREADY_EXISTS (ERROR)
//! - UDTF_INTERNAL_ERROR (FATAL)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::executor::Phase;

/// Severity levels for structured errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// The query failed; the engine is healthy
    Error,
    /// The engine itself misbehaved
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Stable error kinds. The code string never changes once published.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Produced row does not match the declared output schema
    #[serde(rename = "UDTF_RETURN_SCHEMA_MISMATCH")]
    ReturnSchemaMismatch,
    /// Declared output schema is itself invalid
    #[serde(rename = "INVALID_UDTF_RETURN_TYPE")]
    InvalidReturnType,
    /// The routine raised while producing rows
    #[serde(rename = "UDTF_EXEC_ERROR")]
    ExecError,
    /// A conforming row could not be serialized
    #[serde(rename = "UDTF_ENCODE_FAILED")]
    EncodeFailed,
    /// Execution stopped on request or on client disconnect
    #[serde(rename = "UDTF_CANCELLED")]
    Cancelled,
    /// No function registered under the name
    #[serde(rename = "UDTF_NOT_FOUND")]
    NotFound,
    /// A function is already registered under the name
    #[serde(rename = "UDTF_ALREADY_EXISTS")]
    AlreadyExists,
    /// Executor used outside its lifecycle
    #[serde(rename = "UDTF_INTERNAL_ERROR")]
    Internal,
}

impl ErrorKind {
    /// All kinds, in code order
    pub const ALL: [ErrorKind; 8] = [
        ErrorKind::ReturnSchemaMismatch,
        ErrorKind::InvalidReturnType,
        ErrorKind::ExecError,
        ErrorKind::EncodeFailed,
        ErrorKind::Cancelled,
        ErrorKind::NotFound,
        ErrorKind::AlreadyExists,
        ErrorKind::Internal,
    ];

    /// Returns the stable string code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::ReturnSchemaMismatch => "UDTF_RETURN_SCHEMA_MISMATCH",
            ErrorKind::InvalidReturnType => "INVALID_UDTF_RETURN_TYPE",
            ErrorKind::ExecError => "UDTF_EXEC_ERROR",
            ErrorKind::EncodeFailed => "UDTF_ENCODE_FAILED",
            ErrorKind::Cancelled => "UDTF_CANCELLED",
            ErrorKind::NotFound => "UDTF_NOT_FOUND",
            ErrorKind::AlreadyExists => "UDTF_ALREADY_EXISTS",
            ErrorKind::Internal => "UDTF_INTERNAL_ERROR",
        }
    }

    /// Looks up a kind by its string code
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.code() == code)
    }

    /// Returns the severity level for this kind
    pub fn severity(&self) -> Severity {
        match self {
            ErrorKind::Internal => Severity::Fatal,
            _ => Severity::Error,
        }
    }

    /// True for problems with the declaration rather than with produced rows
    pub fn is_declaration_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidReturnType | ErrorKind::NotFound | ErrorKind::AlreadyExists
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Expected/actual detail for schema mismatches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MismatchDetails {
    /// Field count (arity) or declared type name
    pub expected: String,
    /// Value count (arity) or found value kind
    pub actual: String,
    /// Offending position for type mismatches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_index: Option<usize>,
}

/// Structured error with a stable kind and a human-readable message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredError {
    kind: ErrorKind,
    message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    function: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    phase: Option<Phase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    details: Option<MismatchDetails>,
}

impl StructuredError {
    /// Create an error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            function: None,
            phase: None,
            details: None,
        }
    }

    /// Create an arity mismatch error
    pub fn arity_mismatch(expected: usize, actual: usize) -> Self {
        let mut err = Self::new(
            ErrorKind::ReturnSchemaMismatch,
            format!(
                "Input row doesn't have expected number of values required by the schema. \
                 {} fields are required while {} values are provided.",
                expected, actual
            ),
        );
        err.details = Some(MismatchDetails {
            expected: expected.to_string(),
            actual: actual.to_string(),
            field_index: None,
        });
        err
    }

    /// Create a type mismatch error
    pub fn type_mismatch(index: usize, declared: &str, actual: &str) -> Self {
        let mut err = Self::new(
            ErrorKind::ReturnSchemaMismatch,
            format!(
                "Output row value at position {} doesn't match the schema. \
                 Expected type {}, but got {}.",
                index, declared, actual
            ),
        );
        err.details = Some(MismatchDetails {
            expected: declared.to_string(),
            actual: actual.to_string(),
            field_index: Some(index),
        });
        err
    }

    /// Create an invalid return type error
    pub fn invalid_return_type(reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::InvalidReturnType,
            format!("Invalid user-defined table function return type. {}", reason),
        )
    }

    /// Create an error for a failure raised inside the routine
    pub fn exec_error(phase: Phase, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::ExecError,
            format!(
                "User defined table function encountered an error in the '{}' method: {}",
                phase.method_name(),
                reason
            ),
        )
        .with_phase(phase)
    }

    /// Create an encoding failure error
    pub fn encode_failed(reason: impl fmt::Display) -> Self {
        Self::new(ErrorKind::EncodeFailed, format!("Failed to encode output: {}", reason))
    }

    /// Create a cancellation error
    pub fn cancelled(reason: impl fmt::Display) -> Self {
        Self::new(ErrorKind::Cancelled, format!("Execution cancelled: {}", reason))
    }

    /// Create a not found error
    pub fn not_found(name: &str) -> Self {
        Self::new(
            ErrorKind::NotFound,
            format!("Table function '{}' not found", name),
        )
        .with_function(name)
    }

    /// Create an already exists error
    pub fn already_exists(name: &str) -> Self {
        Self::new(
            ErrorKind::AlreadyExists,
            format!("Table function '{}' is already registered", name),
        )
        .with_function(name)
    }

    /// Create an internal error
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, reason)
    }

    /// Attach the phase the error was raised in
    pub fn with_phase(mut self, phase: Phase) -> Self {
        self.phase = Some(phase);
        self
    }

    /// Attach the function name
    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        self.function = Some(name.into());
        self
    }

    /// Returns the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the function name if known
    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    /// Returns the phase if applicable
    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    /// Returns mismatch details if applicable
    pub fn details(&self) -> Option<&MismatchDetails> {
        self.details.as_ref()
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StructuredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.kind.code(), self.message)
    }
}

impl std::error::Error for StructuredError {}

/// Result type for operations that report structured errors
pub type UdtfResult<T> = Result<T, StructuredError>;
