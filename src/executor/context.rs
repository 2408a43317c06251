//! Per-invocation execution context

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::functions::{Routine, RoutineResult, RowStream};
use crate::schema::Row;

/// Which routine method is producing rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Per-row phase
    Eval,
    /// Terminal phase, after the input is exhausted
    Terminate,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Eval => "eval",
            Phase::Terminate => "terminate",
        }
    }

    /// Name of the routine method behind this phase
    pub fn method_name(&self) -> &'static str {
        self.as_str()
    }

    /// Prefix of the scope events logged around this phase
    pub(crate) fn scope_name(&self) -> &'static str {
        match self {
            Phase::Eval => "UDTF_EVAL",
            Phase::Terminate => "UDTF_TERMINATE",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of one routine invocation.
///
/// Created per input row, or once for the terminal call. Holds the routine's
/// lazy output stream, which borrows the routine until the context is
/// dropped.
pub struct ExecutionContext<'r> {
    id: Uuid,
    phase: Phase,
    input_arity: usize,
    started_at: DateTime<Utc>,
    emitted: usize,
    stream: RowStream<'r>,
}

impl<'r> ExecutionContext<'r> {
    /// Starts the per-row phase for one input row
    pub fn eval(routine: &'r mut Routine, input: Row) -> Self {
        let input_arity = input.len();
        Self::open(Phase::Eval, input_arity, routine.eval(input))
    }

    /// Starts the terminal phase; `None` if the routine has none
    pub fn terminate(routine: &'r mut Routine) -> Option<Self> {
        routine
            .terminate()
            .map(|stream| Self::open(Phase::Terminate, 0, stream))
    }

    fn open(phase: Phase, input_arity: usize, stream: RowStream<'r>) -> Self {
        Self {
            id: Uuid::new_v4(),
            phase,
            input_arity,
            started_at: Utc::now(),
            emitted: 0,
            stream,
        }
    }

    /// Invocation ID
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of values bound to the input row (0 for the terminal phase)
    pub fn input_arity(&self) -> usize {
        self.input_arity
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Rows accepted so far
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Pulls the next produced row
    pub fn pull(&mut self) -> Option<RoutineResult<Row>> {
        self.stream.next()
    }

    /// Records that the last pulled row was accepted
    pub fn record_emitted(&mut self) {
        self.emitted += 1;
    }
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.id)
            .field("phase", &self.phase)
            .field("input_arity", &self.input_arity)
            .field("emitted", &self.emitted)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::builtin;
    use serde_json::json;

    #[test]
    fn test_phase_names() {
        assert_eq!(Phase::Eval.method_name(), "eval");
        assert_eq!(Phase::Terminate.to_string(), "terminate");
        assert_eq!(serde_json::to_string(&Phase::Terminate).unwrap(), "\"terminate\"");
    }

    #[test]
    fn test_eval_context_pulls_lazily() {
        let mut routine = builtin::explode();
        let mut ctx = ExecutionContext::eval(&mut routine, vec![json!(["a", "b"])]);
        assert_eq!(ctx.phase(), Phase::Eval);
        assert_eq!(ctx.input_arity(), 1);
        assert_eq!(ctx.pull().unwrap().unwrap(), vec![json!("a")]);
        ctx.record_emitted();
        assert_eq!(ctx.emitted(), 1);
    }

    #[test]
    fn test_terminate_context_absent_for_eval_only() {
        let mut routine = builtin::explode();
        assert!(ExecutionContext::terminate(&mut routine).is_none());

        let mut counting = builtin::row_count();
        assert!(ExecutionContext::terminate(&mut counting).is_some());
    }
}
