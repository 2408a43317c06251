//! # Routine Errors

use thiserror::Error;

/// Result type for rows produced by a routine
pub type RoutineResult<T> = Result<T, RoutineError>;

/// An error raised by user code while producing rows
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RoutineError {
    message: String,
}

impl RoutineError {
    /// Create a routine error with a message
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the message
    pub fn message(&self) -> &str {
        &self.message
    }
}
