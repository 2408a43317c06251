//! JSON I/O handling for CLI
//!
//! - Input: one JSON array (an input row) per line via stdin
//! - Output: one JSON object per line via stdout
//! - UTF-8 only

use std::io::{self, BufRead, Write};

use serde_json::Value;

use crate::schema::Row;

use super::errors::{CliError, CliResult};

/// Read input rows, one JSON array per line. Blank lines are skipped.
pub fn read_rows<R: BufRead>(reader: R) -> CliResult<Vec<Row>> {
    let mut rows = Vec::new();
    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&line)? {
            Value::Array(values) => rows.push(values),
            _ => {
                return Err(CliError::invalid_argument(format!(
                    "line {}: input row must be a JSON array",
                    number + 1
                )))
            }
        }
    }
    Ok(rows)
}

/// Write a success response to stdout
pub fn write_response(data: Value) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "ok",
        "data": data
    });
    write_value(&response)
}

/// Write an error response to stdout
pub fn write_error(code: &str, message: &str) -> CliResult<()> {
    let response = serde_json::json!({
        "status": "error",
        "code": code,
        "message": message
    });
    write_value(&response)
}

/// Write one JSON value as a line to stdout
pub fn write_value(value: &Value) -> CliResult<()> {
    let mut stdout = io::stdout();
    serde_json::to_writer(&mut stdout, value)?;
    writeln!(stdout)?;
    stdout.flush()?;
    Ok(())
}
