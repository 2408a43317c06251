//! tvfexec CLI entry point
//!
//! Parses arguments, dispatches to the CLI module, prints errors to stderr
//! and exits non-zero on failure. All logic lives in `cli`.

use tvfexec::cli;

fn main() {
    if let Err(e) = cli::run() {
        eprintln!("{}: {}", e.code(), e);
        std::process::exit(1);
    }
}
