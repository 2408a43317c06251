//! Table-function executor
//!
//! Drives one routine instance over one partition of input.
//!
//! Execution flow (strict order, per produced row):
//! 1. Check the cancellation flag
//! 2. Pull the next row from the routine
//! 3. Validate it against the declared schema
//! 4. Hand it to the encoder, which may emit frames into the sink
//!
//! The first failure at any step ends the partition. The encoder is flushed
//! (or, on cancellation, discarded), the failure is reported once, an error
//! frame is written, and the same error is returned from every later call.

use std::sync::Arc;

use serde::Serialize;

use crate::config::ExecutionConfig;
use crate::encoder::{new_encoder, EncodeError, EncodingMode, Frame, FrameSink, RowEncoder, SinkError};
use crate::errors::{ErrorChannel, Failure, StructuredError, UdtfResult};
use crate::functions::{Routine, TableFunction};
use crate::observability::{Logger, MetricsRegistry, ObservationScope, Severity, Timer};
use crate::schema::{Row, SchemaRef, SchemaValidator};

use super::cancel::CancellationFlag;
use super::context::{ExecutionContext, Phase};
use super::state::ExecutorState;

/// Counts for one finished partition
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub function: String,
    pub mode: Option<EncodingMode>,
    pub input_rows: u64,
    pub eval_rows: u64,
    pub terminate_rows: u64,
    pub frames: u64,
    pub duration_ms: u64,
}

impl ExecutionSummary {
    /// Rows accepted across both phases
    pub fn output_rows(&self) -> u64 {
        self.eval_rows + self.terminate_rows
    }
}

/// Sink wrapper that counts frames as they leave
struct CountingSink<S> {
    inner: S,
    frames: u64,
    metrics: Arc<MetricsRegistry>,
}

impl<S: FrameSink> FrameSink for CountingSink<S> {
    fn send(&mut self, frame: Frame) -> Result<(), SinkError> {
        let is_batch = matches!(frame, Frame::Batch { .. });
        self.inner.send(frame)?;
        self.frames += 1;
        self.metrics.increment_frames();
        if is_batch {
            self.metrics.increment_batches();
        }
        Ok(())
    }
}

/// Everything the pull loop touches except the routine itself
struct Pipeline<S> {
    validator: SchemaValidator,
    encoder: Box<dyn RowEncoder>,
    sink: CountingSink<S>,
    cancel: CancellationFlag,
    metrics: Arc<MetricsRegistry>,
}

impl<S: FrameSink> Pipeline<S> {
    /// Pulls, validates and encodes until the context is exhausted.
    fn drain(&mut self, ctx: &mut ExecutionContext<'_>) -> Result<(), Failure> {
        let phase = ctx.phase();
        loop {
            if self.cancel.is_cancelled() {
                return Err(Failure::Cancelled {
                    reason: "cancellation requested".to_string(),
                    phase,
                });
            }

            let row = match ctx.pull() {
                None => return Ok(()),
                Some(Ok(row)) => row,
                Some(Err(error)) => return Err(Failure::Routine { error, phase }),
            };

            let outcome = self.validator.validate(&row);
            if !outcome.is_conforming() {
                return Err(Failure::Validation { outcome, phase });
            }

            self.encoder
                .encode(row, &mut self.sink)
                .map_err(|error| encode_failure(error, phase))?;
            self.metrics.increment_output_rows();
            ctx.record_emitted();
        }
    }
}

fn encode_failure(error: EncodeError, phase: Phase) -> Failure {
    if error.is_disconnect() {
        Failure::Cancelled {
            reason: error.to_string(),
            phase,
        }
    } else {
        Failure::Encode { error, phase }
    }
}

/// Executes one table function over one partition of input rows
pub struct TableFunctionExecutor<S: FrameSink> {
    function: String,
    schema: SchemaRef,
    routine: Routine,
    pipeline: Pipeline<S>,
    channel: ErrorChannel,
    state: ExecutorState,
    failure: Option<StructuredError>,
    summary: ExecutionSummary,
    timer: Timer,
}

impl<S: FrameSink> TableFunctionExecutor<S> {
    /// Creates an executor with a fresh routine instance
    pub fn new(function: &TableFunction, config: &ExecutionConfig, sink: S) -> Self {
        Self::with_metrics(function, config, sink, Arc::new(MetricsRegistry::new()))
    }

    /// Creates an executor that reports into shared counters
    pub fn with_metrics(
        function: &TableFunction,
        config: &ExecutionConfig,
        sink: S,
        metrics: Arc<MetricsRegistry>,
    ) -> Self {
        let schema = Arc::clone(function.schema());
        let mode = config.encoding_mode();
        Self {
            function: function.name().to_string(),
            routine: function.instantiate(),
            pipeline: Pipeline {
                validator: SchemaValidator::new(Arc::clone(&schema)),
                encoder: new_encoder(mode, Arc::clone(&schema), config.arrow_batch_size),
                sink: CountingSink {
                    inner: sink,
                    frames: 0,
                    metrics: Arc::clone(&metrics),
                },
                cancel: CancellationFlag::new(),
                metrics: Arc::clone(&metrics),
            },
            channel: ErrorChannel::new(function.name(), metrics),
            schema,
            state: ExecutorState::Init,
            failure: None,
            summary: ExecutionSummary {
                function: function.name().to_string(),
                mode: Some(mode),
                ..Default::default()
            },
            timer: Timer::new(),
        }
    }

    /// Stops this executor when `flag` is raised
    pub fn with_cancellation(mut self, flag: CancellationFlag) -> Self {
        self.pipeline.cancel = flag;
        self
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    /// The error that ended this executor, if any
    pub fn failure(&self) -> Option<&StructuredError> {
        self.failure.as_ref()
    }

    /// The output sink
    pub fn sink(&self) -> &S {
        &self.pipeline.sink.inner
    }

    /// Consumes the executor, returning its sink
    pub fn into_sink(self) -> S {
        self.pipeline.sink.inner
    }

    /// Counts so far
    pub fn summary(&self) -> ExecutionSummary {
        ExecutionSummary {
            frames: self.pipeline.sink.frames,
            duration_ms: self.timer.elapsed_ms(),
            ..self.summary.clone()
        }
    }

    /// Runs the per-row phase for one input row.
    ///
    /// Returns the number of rows the routine produced for it.
    pub fn eval(&mut self, input: Row) -> UdtfResult<usize> {
        self.check_usable()?;
        if !self.state.accepts_input() {
            return Err(StructuredError::internal(format!(
                "eval called in state '{}'",
                self.state
            ))
            .with_function(&self.function));
        }
        self.state = ExecutorState::Running;
        self.summary.input_rows += 1;
        self.pipeline.metrics.increment_input_rows();

        let mut ctx = ExecutionContext::eval(&mut self.routine, input);
        let scope = phase_scope(&self.function, &ctx, Severity::Trace);
        let result = self.pipeline.drain(&mut ctx);
        let emitted = ctx.emitted();
        drop(ctx);

        self.summary.eval_rows += emitted as u64;
        match result {
            Ok(()) => {
                let rows = emitted.to_string();
                scope.complete_with_fields(&[("rows", rows.as_str())]);
                Ok(emitted)
            }
            Err(failure) => {
                let err = self.fail(failure);
                scope.fail(err.kind().code());
                Err(err)
            }
        }
    }

    /// Runs the terminal phase, if any, and flushes the encoder.
    ///
    /// Returns the number of rows the terminal phase produced.
    pub fn terminate(&mut self) -> UdtfResult<usize> {
        self.check_usable()?;
        if !self.state.accepts_input() {
            return Err(StructuredError::internal(format!(
                "terminate called in state '{}'",
                self.state
            ))
            .with_function(&self.function));
        }
        self.state = ExecutorState::Draining;

        if self.pipeline.cancel.is_cancelled() {
            let err = self.fail(Failure::Cancelled {
                reason: "cancellation requested".to_string(),
                phase: Phase::Terminate,
            });
            return Err(err);
        }

        let drained = match ExecutionContext::terminate(&mut self.routine) {
            Some(mut ctx) => {
                let scope = phase_scope(&self.function, &ctx, Severity::Info);
                let result = self.pipeline.drain(&mut ctx);
                Some((scope, result, ctx.emitted()))
            }
            None => None,
        };

        let mut emitted = 0;
        match drained {
            Some((scope, result, rows)) => {
                emitted = rows;
                self.summary.terminate_rows += rows as u64;
                if let Err(failure) = result {
                    let err = self.fail(failure);
                    scope.fail(err.kind().code());
                    return Err(err);
                }
                let rows = rows.to_string();
                scope.complete_with_fields(&[("rows", rows.as_str())]);
            }
            None => Logger::trace(
                "UDTF_TERMINATE_SKIPPED",
                &[("function", self.function.as_str())],
            ),
        }

        let pipeline = &mut self.pipeline;
        if let Err(error) = pipeline.encoder.flush(&mut pipeline.sink) {
            let err = self.fail(encode_failure(error, Phase::Terminate));
            return Err(err);
        }

        self.state = ExecutorState::Done;
        Ok(emitted)
    }

    /// Evaluates every input row, then terminates
    pub fn run<I>(&mut self, inputs: I) -> UdtfResult<ExecutionSummary>
    where
        I: IntoIterator<Item = Row>,
    {
        for input in inputs {
            self.eval(input)?;
        }
        self.terminate()?;
        Ok(self.summary())
    }

    /// Returns the cached error once the executor has failed
    fn check_usable(&self) -> UdtfResult<()> {
        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    /// Ends the partition on its first failure.
    fn fail(&mut self, failure: Failure) -> StructuredError {
        let cancelled = matches!(failure, Failure::Cancelled { .. });
        let pipeline = &mut self.pipeline;

        if cancelled {
            pipeline.encoder.discard();
        } else if let Err(error) = pipeline.encoder.flush(&mut pipeline.sink) {
            let reason = error.to_string();
            Logger::warn(
                "UDTF_FLUSH_ON_FAILURE_FAILED",
                &[
                    ("function", self.function.as_str()),
                    ("reason", reason.as_str()),
                ],
            );
        }

        let err = self.channel.report(failure);
        if pipeline.sink.send(Frame::Error(err.clone())).is_err() {
            Logger::warn(
                "UDTF_ERROR_FRAME_UNDELIVERED",
                &[
                    ("code", err.kind().code()),
                    ("function", self.function.as_str()),
                ],
            );
        }

        self.state = if cancelled {
            ExecutorState::Cancelled
        } else {
            ExecutorState::Failed
        };
        self.failure = Some(err.clone());
        err
    }
}

fn phase_scope(function: &str, ctx: &ExecutionContext<'_>, severity: Severity) -> ObservationScope {
    ObservationScope::with_fields(
        ctx.phase().scope_name(),
        severity,
        vec![
            ("function", function.to_string()),
            ("invocation", ctx.id().to_string()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::{FrameDecoder, VecSink};
    use crate::errors::ErrorKind;
    use crate::functions::{builtin, from_fn, from_fns, try_from_fn, RoutineError};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn executor(function: &TableFunction) -> TableFunctionExecutor<VecSink> {
        TableFunctionExecutor::new(function, &ExecutionConfig::default(), VecSink::new())
    }

    #[test]
    fn test_run_explode() {
        let function = TableFunction::new("explode", "col: int", builtin::explode).unwrap();
        let mut exec = executor(&function);
        let summary = exec
            .run(vec![vec![json!([1, 2])], vec![json!([3])]])
            .unwrap();

        assert_eq!(exec.state(), ExecutorState::Done);
        assert_eq!(summary.input_rows, 2);
        assert_eq!(summary.output_rows(), 3);
        assert_eq!(summary.frames, 3);

        let rows = FrameDecoder::new(Arc::clone(function.schema()))
            .collect(exec.sink().frames())
            .unwrap();
        assert_eq!(rows, vec![vec![json!(1)], vec![json!(2)], vec![json!(3)]]);
    }

    #[test]
    fn test_type_mismatch_fails_partition() {
        let function = TableFunction::new("f", "a: int", || {
            from_fn(|_row: Row| vec![vec![json!(1)], vec![json!("two")], vec![json!(3)]])
        })
        .unwrap();
        let mut exec = executor(&function);
        let err = exec.eval(vec![]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ReturnSchemaMismatch);
        assert_eq!(err.phase(), Some(Phase::Eval));
        assert_eq!(exec.state(), ExecutorState::Failed);

        let frames = exec.sink().frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], Frame::Row(b"[1]".to_vec()));
        assert!(frames[1].as_error().is_some());
    }

    #[test]
    fn test_failed_executor_repeats_error_without_routine() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let function = TableFunction::new("f", "a: int", move || {
            let counter = Arc::clone(&counter);
            from_fn(move |_row: Row| {
                counter.fetch_add(1, Ordering::SeqCst);
                vec![vec![json!(1), json!(2)]]
            })
        })
        .unwrap();
        let mut exec = executor(&function);

        let first = exec.eval(vec![]).unwrap_err();
        let second = exec.eval(vec![]).unwrap_err();
        let third = exec.terminate().unwrap_err();
        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(exec.sink().frames().len(), 1);
    }

    #[test]
    fn test_routine_error_reported_as_exec_error() {
        let function = TableFunction::new("f", "a: int", || {
            try_from_fn(|_row: Row| vec![Err(RoutineError::new("bad input"))])
        })
        .unwrap();
        let mut exec = executor(&function);
        let err = exec.eval(vec![]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExecError);
        assert!(err.message().contains("bad input"));
    }

    #[test]
    fn test_terminate_skipped_for_eval_only() {
        let function = TableFunction::new("f", "a: int", || from_fn(|row: Row| vec![row])).unwrap();
        let mut exec = executor(&function);
        exec.eval(vec![json!(1)]).unwrap();
        assert_eq!(exec.terminate().unwrap(), 0);
        assert_eq!(exec.state(), ExecutorState::Done);
    }

    #[test]
    fn test_terminate_rows_follow_eval_rows() {
        let function = TableFunction::new("f", "a: string", || {
            from_fns(|row: Row| vec![row], || vec![vec![json!("end")]])
        })
        .unwrap();
        let mut exec = executor(&function);
        let summary = exec.run(vec![vec![json!("x")]]).unwrap();
        assert_eq!(summary.eval_rows, 1);
        assert_eq!(summary.terminate_rows, 1);
        assert_eq!(exec.sink().frames()[1], Frame::Row(br#"["end"]"#.to_vec()));
    }

    #[test]
    fn test_eval_after_terminate_is_misuse() {
        let function = TableFunction::new("f", "a: int", builtin::explode).unwrap();
        let mut exec = executor(&function);
        exec.terminate().unwrap();
        let err = exec.eval(vec![json!([1])]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(exec.state(), ExecutorState::Done);
    }

    #[test]
    fn test_cancellation_discards_partial_block() {
        let function = TableFunction::new("f", "a: int", builtin::explode).unwrap();
        let config = ExecutionConfig {
            arrow_enabled: true,
            arrow_batch_size: 100,
            ..Default::default()
        };
        let flag = CancellationFlag::new();
        let mut exec = TableFunctionExecutor::new(&function, &config, VecSink::new())
            .with_cancellation(flag.clone());

        exec.eval(vec![json!([1, 2, 3])]).unwrap();
        flag.cancel();
        let err = exec.eval(vec![json!([4])]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert_eq!(exec.state(), ExecutorState::Cancelled);
        let frames = exec.sink().frames();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].as_error().is_some());
    }

    #[test]
    fn test_failure_flushes_partial_block() {
        let function = TableFunction::new("f", "a: int", || {
            from_fn(|_row: Row| vec![vec![json!(1)], vec![json!(2)], vec![json!(null), json!(3)]])
        })
        .unwrap();
        let config = ExecutionConfig {
            arrow_enabled: true,
            arrow_batch_size: 100,
            ..Default::default()
        };
        let mut exec = TableFunctionExecutor::new(&function, &config, VecSink::new());
        exec.eval(vec![]).unwrap_err();

        let frames = exec.sink().frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].row_count(), 2);
        assert!(frames[1].as_error().is_some());
    }
}
