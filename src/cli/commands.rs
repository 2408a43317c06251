//! CLI command implementations
//!
//! Commands are thin: they resolve a function and a configuration, hand the
//! input to the query runner, and print JSON results on stdout.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::{json, Value};

use crate::config::{ExecutionConfig, ARROW_ENABLED_KEY};
use crate::encoder::{Frame, FrameDecoder};
use crate::errors::StructuredError;
use crate::executor::QueryRunner;
use crate::functions::{builtin, FunctionRegistry, TableFunction};
use crate::observability::{Logger, MetricsRegistry, Severity};
use crate::rpc::RemoteError;
use crate::schema::{parse_return_type, Row};
use crate::wire::{FrameReader, FrameWriter};

use super::args::Command;
use super::errors::{CliError, CliResult};
use super::io::{read_rows, write_error, write_response, write_value};

/// Options of the `run` command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub function: String,
    pub return_type: Option<String>,
    pub config: Option<PathBuf>,
    pub arrow: bool,
    pub settings: Vec<String>,
    pub partitions: usize,
    pub output: Option<PathBuf>,
}

/// Main CLI entry point
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    let severity = Severity::from_name(&cli.log_level).ok_or_else(|| {
        CliError::invalid_argument(format!("unknown log level '{}'", cli.log_level))
    })?;
    Logger::set_min_severity(severity);
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Run {
            function,
            return_type,
            config,
            arrow,
            settings,
            partitions,
            output,
        } => {
            let options = RunOptions {
                function,
                return_type,
                config,
                arrow,
                settings,
                partitions,
                output,
            };
            let stdin = io::stdin();
            let input = stdin.lock();
            run_function(&options, input)
        }
        Command::ParseType { ddl } => parse_type(&ddl),
        Command::Decode { path, return_type } => decode(&path, &return_type),
        Command::Functions => functions(),
    }
}

/// Builds the query configuration from file, flags and `KEY=VALUE` overrides
pub fn resolve_config(options: &RunOptions) -> CliResult<ExecutionConfig> {
    let mut config = match &options.config {
        Some(path) => ExecutionConfig::load(path)?,
        None => ExecutionConfig::default(),
    };
    if options.arrow {
        config.set(ARROW_ENABLED_KEY, "true")?;
    }
    for setting in &options.settings {
        let (key, value) = setting.split_once('=').ok_or_else(|| {
            CliError::invalid_argument(format!("expected KEY=VALUE, got '{}'", setting))
        })?;
        config.set(key.trim(), value)?;
    }
    Ok(config)
}

/// Binds a built-in routine to a declared return type
pub fn resolve_function(name: &str, return_type: Option<&str>) -> CliResult<TableFunction> {
    let builtin = builtin::lookup(name).ok_or_else(|| StructuredError::not_found(name))?;
    let return_type = return_type.unwrap_or(builtin.default_return_type);
    Ok(TableFunction::new(builtin.name, return_type, builtin.build)?)
}

/// Deals rows round-robin into `count` partitions
fn partition(rows: Vec<Row>, count: usize) -> Vec<Vec<Row>> {
    let mut partitions: Vec<Vec<Row>> = (0..count).map(|_| Vec::new()).collect();
    for (i, row) in rows.into_iter().enumerate() {
        partitions[i % count].push(row);
    }
    partitions
}

/// Run a table function over input rows
pub fn run_function<R: BufRead>(options: &RunOptions, input: R) -> CliResult<()> {
    if options.partitions == 0 {
        return Err(CliError::invalid_argument("--partitions must be > 0"));
    }
    let config = resolve_config(options)?;
    let function = resolve_function(&options.function, options.return_type.as_deref())?;
    let partitions = partition(read_rows(input)?, options.partitions);

    let metrics = Arc::new(MetricsRegistry::new());
    let runner = QueryRunner::with_metrics(config, Arc::clone(&metrics));
    let runtime = tokio::runtime::Runtime::new()?;
    let outputs = runtime.block_on(runner.collect(&function, partitions));

    if let Some(path) = &options.output {
        let mut writer = FrameWriter::new(BufWriter::new(File::create(path)?));
        for frame in outputs.iter().flat_map(|o| o.frames.iter()) {
            writer.write_frame(frame)?;
        }
        writer.flush()?;
    }

    let decoder = FrameDecoder::new(Arc::clone(function.schema()));
    let mut rows = Vec::new();
    let mut summaries = Vec::new();
    for output in &outputs {
        rows.extend(decoder.collect_partial(&output.frames)?.rows);
        match &output.result {
            Ok(summary) => summaries.push(serde_json::to_value(summary)?),
            Err(err) => summaries.push(json!({
                "partition": output.index,
                "error": err,
            })),
        }
    }

    if let Some(err) = outputs.iter().find_map(|o| o.result.as_ref().err()) {
        write_error(err.kind().code(), RemoteError::wrap(err).message())?;
        return Err(CliError::Udtf(err.clone()));
    }

    let mut data = json!({
        "function": function.name(),
        "return_type": function.schema().to_string(),
        "partitions": summaries,
        "metrics": metrics.snapshot(),
    });
    if options.output.is_none() {
        data["rows"] = Value::from(rows.into_iter().map(Value::Array).collect::<Vec<_>>());
    }
    write_response(data)
}

/// Parse a return-type descriptor
pub fn parse_type(ddl: &str) -> CliResult<()> {
    let schema = parse_return_type(ddl).map_err(StructuredError::invalid_return_type)?;
    write_response(json!({
        "schema": schema.to_string(),
        "fields": schema.fields(),
    }))
}

/// Decode a framed output file, printing one row per line
pub fn decode(path: &Path, return_type: &str) -> CliResult<()> {
    let schema = parse_return_type(return_type).map_err(StructuredError::invalid_return_type)?;
    let file = File::open(path)?;
    let frames = FrameReader::new(BufReader::new(file)).read_all()?;

    let partial = FrameDecoder::new(schema.into_ref()).collect_partial(&frames)?;
    for row in partial.rows {
        write_value(&Value::Array(row))?;
    }

    if let Some(err) = frames.iter().find_map(Frame::as_error) {
        write_error(err.kind().code(), RemoteError::wrap(err).message())?;
        return Err(CliError::Udtf(err.clone()));
    }
    Ok(())
}

/// List built-in functions
pub fn functions() -> CliResult<()> {
    let registry = FunctionRegistry::with_builtins()?;
    let listed: Vec<Value> = registry
        .list()
        .into_iter()
        .map(|info| {
            let description = builtin::lookup(&info.name).map(|b| b.description);
            json!({
                "name": info.name,
                "return_type": info.return_type,
                "description": description,
            })
        })
        .collect();
    write_response(Value::from(listed))
}
