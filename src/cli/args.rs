//! CLI argument definitions using clap
//!
//! Commands:
//! - tvfexec run --function <name> [--return-type <ddl>] [--config <path>] [--arrow] [--output <path>]
//! - tvfexec parse-type <ddl>
//! - tvfexec decode <path> --return-type <ddl>
//! - tvfexec functions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// tvfexec - strict table-function execution
#[derive(Parser, Debug)]
#[command(name = "tvfexec")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Minimum log severity (trace, info, warn, error, fatal)
    #[arg(long, global = true, default_value = "error")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a table function over JSON-array rows read from stdin
    Run {
        /// Built-in function to run
        #[arg(long)]
        function: String,

        /// Declared return type (defaults to the function's own)
        #[arg(long)]
        return_type: Option<String>,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Emit Arrow blocks instead of JSON rows
        #[arg(long)]
        arrow: bool,

        /// Override a configuration key, e.g. udtf.arrow.maxRecordsPerBatch=100
        #[arg(long = "set", value_name = "KEY=VALUE")]
        settings: Vec<String>,

        /// Number of input partitions (rows are dealt round-robin)
        #[arg(long, default_value_t = 1)]
        partitions: usize,

        /// Write framed output here instead of printing rows
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Parse a return-type descriptor and print the schema
    ParseType {
        /// Return-type descriptor, e.g. "a: int, b: string"
        ddl: String,
    },

    /// Decode a framed output file and print its rows
    Decode {
        /// Framed output file
        path: PathBuf,

        /// Return type the output was produced with
        #[arg(long)]
        return_type: String,
    },

    /// List built-in functions
    Functions,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
