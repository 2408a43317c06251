//! Structured errors and the failure reporting channel
//!
//! Failures inside the engine are local signals. They leave the engine as a
//! [`StructuredError`] whose kind is stable across the RPC boundary.

mod channel;
mod error;

pub use channel::{ErrorChannel, Failure};
pub use error::{ErrorKind, MismatchDetails, Severity, StructuredError, UdtfResult};
