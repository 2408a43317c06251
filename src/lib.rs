//! tvfexec - A strict table-function execution engine
//!
//! Runs user-defined table functions over partitioned input, validates every
//! produced row against the declared return type, encodes accepted rows
//! row-wise or as Arrow blocks, and reports the first violation as a
//! structured error with a stable code.

pub mod cli;
pub mod config;
pub mod encoder;
pub mod errors;
pub mod executor;
pub mod functions;
pub mod observability;
pub mod rpc;
pub mod schema;
pub mod wire;
