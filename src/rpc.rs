//! Errors as seen across the execution boundary
//!
//! Remote errors are pass-through: the caller only receives the rendered
//! text of the original error, so the stable code must survive inside the
//! message. [`RemoteError::kind`] recovers it by substring.

use std::fmt;

use crate::errors::{ErrorKind, StructuredError};

/// Prefix added to every error crossing the boundary
pub const REMOTE_PREFIX: &str = "Remote execution failed: ";

/// An error received from the executing side
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    message: String,
}

impl RemoteError {
    /// Wraps a structured error for the caller
    pub fn wrap(err: &StructuredError) -> Self {
        Self {
            message: format!("{}{}", REMOTE_PREFIX, err),
        }
    }

    /// Rebuilds a remote error from its rendered text
    pub fn from_message(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Full rendered message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Recovers the error kind from the embedded code.
    ///
    /// The `[SEV] CODE:` header decides. Messages without a readable header
    /// fall back to the earliest code found anywhere in the text.
    pub fn kind(&self) -> Option<ErrorKind> {
        self.header_kind().or_else(|| {
            ErrorKind::ALL
                .into_iter()
                .filter_map(|kind| self.message.find(kind.code()).map(|pos| (pos, kind)))
                .min_by_key(|(pos, _)| *pos)
                .map(|(_, kind)| kind)
        })
    }

    fn header_kind(&self) -> Option<ErrorKind> {
        let rendered = self
            .message
            .strip_prefix(REMOTE_PREFIX)
            .unwrap_or(&self.message);
        let rest = rendered.strip_prefix('[')?;
        let (_, after) = rest.split_once("] ")?;
        let (code, _) = after.split_once(':')?;
        ErrorKind::from_code(code.trim())
    }

    /// Returns true if the message contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.message.contains(needle)
    }
}

impl From<StructuredError> for RemoteError {
    fn from(err: StructuredError) -> Self {
        Self::wrap(&err)
    }
}

impl From<&StructuredError> for RemoteError {
    fn from(err: &StructuredError) -> Self {
        Self::wrap(err)
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RemoteError {}
