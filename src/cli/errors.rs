//! CLI-specific error types
//!
//! All CLI errors are fatal to the invocation. Each carries a stable code
//! that is printed along with the message.

use std::io;

use thiserror::Error;

use crate::config::ConfigError;
use crate::encoder::DecodeError;
use crate::errors::StructuredError;
use crate::wire::WireError;

/// CLI error
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Wire(#[from] WireError),

    #[error("{0}")]
    Decode(#[from] DecodeError),

    #[error("{0}")]
    Udtf(#[from] StructuredError),

    #[error("{0}")]
    InvalidArgument(String),
}

impl CliError {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            CliError::Config(_) => "UDTF_CLI_CONFIG_ERROR",
            CliError::Io(_) | CliError::Json(_) => "UDTF_CLI_IO_ERROR",
            CliError::Wire(_) | CliError::Decode(_) => "UDTF_CLI_BAD_STREAM",
            CliError::Udtf(err) => err.kind().code(),
            CliError::InvalidArgument(_) => "UDTF_CLI_INVALID_ARGUMENT",
        }
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        CliError::InvalidArgument(msg.into())
    }
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;
