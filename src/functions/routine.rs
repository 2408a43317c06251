//! # Routines
//!
//! A routine is the user-supplied row generator behind a table function.
//! `eval` is required and runs once per input row; `terminate` is optional
//! and runs once after the input is exhausted. Whether a routine has a
//! terminal phase is part of its type, not something discovered at runtime.
//!
//! Both phases return a lazy [`RowStream`]. The executor pulls it one row at
//! a time and stops pulling as soon as a row is rejected.

use std::sync::Arc;

use crate::schema::Row;

use super::errors::RoutineResult;

/// Lazy, finite sequence of produced rows
pub type RowStream<'a> = Box<dyn Iterator<Item = RoutineResult<Row>> + 'a>;

/// Builds one routine instance per partition
pub type RoutineFactory = Arc<dyn Fn() -> Routine + Send + Sync>;

/// Per-row entry point
pub trait EvalRoutine: Send {
    /// Produces the rows for one input row
    fn eval(&mut self, input: Row) -> RowStream<'_>;
}

/// A routine that also produces trailing rows at end of input
pub trait TerminalRoutine: EvalRoutine {
    /// Produces the trailing rows
    fn terminate(&mut self) -> RowStream<'_>;
}

/// A routine instance, tagged by its capabilities
pub enum Routine {
    /// Only per-row output
    EvalOnly(Box<dyn EvalRoutine>),
    /// Per-row output plus a terminal phase
    EvalAndTerminate(Box<dyn TerminalRoutine>),
}

impl Routine {
    /// Wrap a routine without a terminal phase
    pub fn eval_only(routine: impl EvalRoutine + 'static) -> Self {
        Routine::EvalOnly(Box::new(routine))
    }

    /// Wrap a routine with a terminal phase
    pub fn with_terminate(routine: impl TerminalRoutine + 'static) -> Self {
        Routine::EvalAndTerminate(Box::new(routine))
    }

    /// Returns true if the routine has a terminal phase
    pub fn has_terminate(&self) -> bool {
        matches!(self, Routine::EvalAndTerminate(_))
    }

    /// Starts the per-row phase for one input row
    pub fn eval(&mut self, input: Row) -> RowStream<'_> {
        match self {
            Routine::EvalOnly(r) => r.eval(input),
            Routine::EvalAndTerminate(r) => r.eval(input),
        }
    }

    /// Starts the terminal phase, if the routine has one
    pub fn terminate(&mut self) -> Option<RowStream<'_>> {
        match self {
            Routine::EvalOnly(_) => None,
            Routine::EvalAndTerminate(r) => Some(r.terminate()),
        }
    }
}

/// Routine backed by an infallible closure
pub struct FnEval<F> {
    eval: F,
}

impl<F, I> EvalRoutine for FnEval<F>
where
    F: FnMut(Row) -> I + Send,
    I: IntoIterator<Item = Row>,
    I::IntoIter: 'static,
{
    fn eval(&mut self, input: Row) -> RowStream<'_> {
        Box::new((self.eval)(input).into_iter().map(Ok))
    }
}

/// Routine backed by a closure whose rows may fail
pub struct TryFnEval<F> {
    eval: F,
}

impl<F, I> EvalRoutine for TryFnEval<F>
where
    F: FnMut(Row) -> I + Send,
    I: IntoIterator<Item = RoutineResult<Row>>,
    I::IntoIter: 'static,
{
    fn eval(&mut self, input: Row) -> RowStream<'_> {
        Box::new((self.eval)(input).into_iter())
    }
}

/// Routine backed by an eval closure and a terminate closure
pub struct FnEvalTerminate<E, T> {
    eval: E,
    terminate: T,
}

impl<E, T, I, J> EvalRoutine for FnEvalTerminate<E, T>
where
    E: FnMut(Row) -> I + Send,
    T: FnMut() -> J + Send,
    I: IntoIterator<Item = Row>,
    I::IntoIter: 'static,
{
    fn eval(&mut self, input: Row) -> RowStream<'_> {
        Box::new((self.eval)(input).into_iter().map(Ok))
    }
}

impl<E, T, I, J> TerminalRoutine for FnEvalTerminate<E, T>
where
    E: FnMut(Row) -> I + Send,
    T: FnMut() -> J + Send,
    I: IntoIterator<Item = Row>,
    I::IntoIter: 'static,
    J: IntoIterator<Item = Row>,
    J::IntoIter: 'static,
{
    fn terminate(&mut self) -> RowStream<'_> {
        Box::new((self.terminate)().into_iter().map(Ok))
    }
}

/// Builds an eval-only routine from a closure
pub fn from_fn<F, I>(eval: F) -> Routine
where
    F: FnMut(Row) -> I + Send + 'static,
    I: IntoIterator<Item = Row>,
    I::IntoIter: 'static,
{
    Routine::eval_only(FnEval { eval })
}

/// Builds an eval-only routine from a closure whose rows may fail
pub fn try_from_fn<F, I>(eval: F) -> Routine
where
    F: FnMut(Row) -> I + Send + 'static,
    I: IntoIterator<Item = RoutineResult<Row>>,
    I::IntoIter: 'static,
{
    Routine::eval_only(TryFnEval { eval })
}

/// Builds a routine with a terminal phase from two closures
pub fn from_fns<E, T, I, J>(eval: E, terminate: T) -> Routine
where
    E: FnMut(Row) -> I + Send + 'static,
    T: FnMut() -> J + Send + 'static,
    I: IntoIterator<Item = Row>,
    I::IntoIter: 'static,
    J: IntoIterator<Item = Row>,
    J::IntoIter: 'static,
{
    Routine::with_terminate(FnEvalTerminate { eval, terminate })
}
