//! # Table Functions
//!
//! Registration surface and routine model. A table function is a name, a
//! declared output schema, and a factory producing one routine instance per
//! partition.

pub mod builtin;
pub mod errors;
pub mod function;
pub mod registry;
pub mod routine;

pub use errors::{RoutineError, RoutineResult};
pub use function::{FunctionInfo, TableFunction};
pub use registry::FunctionRegistry;
pub use routine::{
    from_fn, from_fns, try_from_fn, EvalRoutine, Routine, RoutineFactory, RowStream,
    TerminalRoutine,
};
