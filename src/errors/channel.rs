//! Failure reporting
//!
//! Every failure leaves the engine through exactly one `report` call. The
//! channel turns the local failure signal into a [`StructuredError`], logs it
//! and counts it.

use std::sync::Arc;

use crate::encoder::EncodeError;
use crate::executor::Phase;
use crate::observability::{Event, Logger, MetricsRegistry};
use crate::functions::RoutineError;
use crate::schema::{ReturnTypeError, ValidationOutcome};

use super::error::StructuredError;

/// A local failure signal, before it is given a stable kind
#[derive(Debug)]
pub enum Failure {
    /// A produced row did not conform
    Validation {
        outcome: ValidationOutcome,
        phase: Phase,
    },
    /// The return-type descriptor could not be parsed
    InvalidReturnType(ReturnTypeError),
    /// The routine raised while producing rows
    Routine { error: RoutineError, phase: Phase },
    /// A conforming row could not be encoded or written
    Encode { error: EncodeError, phase: Phase },
    /// Execution stopped before completion
    Cancelled { reason: String, phase: Phase },
}

/// Maps failures to structured errors for one table function.
#[derive(Debug, Clone)]
pub struct ErrorChannel {
    function: String,
    metrics: Arc<MetricsRegistry>,
}

impl ErrorChannel {
    /// Create a channel for the named function
    pub fn new(function: impl Into<String>, metrics: Arc<MetricsRegistry>) -> Self {
        Self {
            function: function.into(),
            metrics,
        }
    }

    /// Returns the function name errors are attributed to
    pub fn function(&self) -> &str {
        &self.function
    }

    /// Converts a failure into its structured error.
    pub fn report(&self, failure: Failure) -> StructuredError {
        let (err, event) = match failure {
            Failure::Validation { outcome, phase } => {
                self.metrics.increment_schema_mismatches();
                let err = match outcome {
                    ValidationOutcome::ArityMismatch { expected, actual } => {
                        StructuredError::arity_mismatch(expected, actual)
                    }
                    ValidationOutcome::TypeMismatch {
                        index,
                        declared,
                        actual,
                    } => StructuredError::type_mismatch(index, declared.type_name(), actual),
                    ValidationOutcome::Conforms => StructuredError::internal(
                        "conforming row reported as a validation failure",
                    ),
                };
                (err.with_phase(phase), Event::SchemaMismatch)
            }
            Failure::InvalidReturnType(reason) => {
                self.metrics.increment_invalid_return_types();
                (
                    StructuredError::invalid_return_type(reason),
                    Event::InvalidReturnType,
                )
            }
            Failure::Routine { error, phase } => {
                self.metrics.increment_routine_failures();
                (StructuredError::exec_error(phase, error), Event::RoutineFailed)
            }
            Failure::Encode { error, phase } => {
                self.metrics.increment_encode_failures();
                (
                    StructuredError::encode_failed(error).with_phase(phase),
                    Event::EncodeFailed,
                )
            }
            Failure::Cancelled { reason, phase } => {
                self.metrics.increment_cancellations();
                (
                    StructuredError::cancelled(reason).with_phase(phase),
                    Event::Cancelled,
                )
            }
        };

        let err = err.with_function(&self.function);
        let phase = err.phase().map(|p| p.as_str()).unwrap_or("registration");
        Logger::error(
            event.as_str(),
            &[
                ("code", err.kind().code()),
                ("function", self.function.as_str()),
                ("message", err.message()),
                ("phase", phase),
            ],
        );
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::encoder::SinkError;
    use crate::schema::FieldType;

    fn channel() -> (ErrorChannel, Arc<MetricsRegistry>) {
        let metrics = Arc::new(MetricsRegistry::new());
        (ErrorChannel::new("udtf", Arc::clone(&metrics)), metrics)
    }

    #[test]
    fn test_arity_and_type_share_kind() {
        let (channel, metrics) = channel();
        let arity = channel.report(Failure::Validation {
            outcome: ValidationOutcome::ArityMismatch {
                expected: 2,
                actual: 3,
            },
            phase: Phase::Terminate,
        });
        let ty = channel.report(Failure::Validation {
            outcome: ValidationOutcome::TypeMismatch {
                index: 0,
                declared: FieldType::Int,
                actual: "string",
            },
            phase: Phase::Eval,
        });
        assert_eq!(arity.kind(), ErrorKind::ReturnSchemaMismatch);
        assert_eq!(ty.kind(), ErrorKind::ReturnSchemaMismatch);
        assert_eq!(arity.phase(), Some(Phase::Terminate));
        assert_eq!(arity.function(), Some("udtf"));
        assert_eq!(metrics.schema_mismatches(), 2);
    }

    #[test]
    fn test_invalid_return_type_kind() {
        let (channel, metrics) = channel();
        let err = channel.report(Failure::InvalidReturnType(ReturnTypeError::NotAStruct(
            "int".into(),
        )));
        assert_eq!(err.kind(), ErrorKind::InvalidReturnType);
        assert!(err.message().contains("Expect a struct type, but got int."));
        assert_eq!(err.phase(), None);
        assert_eq!(metrics.invalid_return_types(), 1);
    }

    #[test]
    fn test_routine_failure_names_method() {
        let (channel, _) = channel();
        let err = channel.report(Failure::Routine {
            error: RoutineError::new("division by zero"),
            phase: Phase::Terminate,
        });
        assert_eq!(err.kind(), ErrorKind::ExecError);
        assert!(err.message().contains("'terminate' method"));
        assert!(err.message().contains("division by zero"));
    }

    #[test]
    fn test_encode_failure_is_counted() {
        let (channel, metrics) = channel();
        let err = channel.report(Failure::Encode {
            error: EncodeError::Sink(SinkError::Write("disk full".into())),
            phase: Phase::Eval,
        });
        assert_eq!(err.kind(), ErrorKind::EncodeFailed);
        assert_eq!(metrics.encode_failures(), 1);
        assert_eq!(metrics.snapshot().encode_failures, 1);
    }
}
