//! CLI module for tvfexec
//!
//! Provides command-line interface for:
//! - run: Execute a built-in table function over stdin rows
//! - parse-type: Check a return-type descriptor
//! - decode: Read back a framed output file
//! - functions: List built-in functions

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{
    decode, functions, parse_type, resolve_config, resolve_function, run, run_command,
    run_function, RunOptions,
};
pub use errors::{CliError, CliResult};
pub use io::{read_rows, write_error, write_response};
