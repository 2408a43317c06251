//! # Table-Function Executor
//!
//! Drives routines over input partitions, one executor per partition.
//!
//! # Invariants
//!
//! - Every produced row is validated before the next one is pulled
//! - Nothing is pulled after the first failure
//! - Each failure is reported exactly once and ends the partition
//! - Rows already emitted are never retracted

mod cancel;
mod context;
mod executor;
mod runner;
mod state;

pub use cancel::CancellationFlag;
pub use context::{ExecutionContext, Phase};
pub use executor::{ExecutionSummary, TableFunctionExecutor};
pub use runner::{PartitionOutput, PartitionStream, QueryRunner};
pub use state::ExecutorState;
