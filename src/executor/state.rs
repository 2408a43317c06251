//! Executor lifecycle

use std::fmt;

use serde::Serialize;

/// Lifecycle of one partition's executor.
///
/// `Init -> Running -> Draining -> Done`. `Failed` and `Cancelled` are
/// absorbing and reachable from `Running` or `Draining`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorState {
    Init,
    Running,
    Draining,
    Done,
    Failed,
    Cancelled,
}

impl ExecutorState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutorState::Init => "init",
            ExecutorState::Running => "running",
            ExecutorState::Draining => "draining",
            ExecutorState::Done => "done",
            ExecutorState::Failed => "failed",
            ExecutorState::Cancelled => "cancelled",
        }
    }

    /// No further rows will be produced
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecutorState::Done | ExecutorState::Failed | ExecutorState::Cancelled
        )
    }

    /// Ended with an error
    pub fn is_error(&self) -> bool {
        matches!(self, ExecutorState::Failed | ExecutorState::Cancelled)
    }

    /// `eval` may still be called
    pub fn accepts_input(&self) -> bool {
        matches!(self, ExecutorState::Init | ExecutorState::Running)
    }
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!ExecutorState::Running.is_terminal());
        assert!(ExecutorState::Done.is_terminal());
        assert!(ExecutorState::Cancelled.is_error());
        assert!(!ExecutorState::Done.is_error());
        assert!(ExecutorState::Init.accepts_input());
        assert!(!ExecutorState::Draining.accepts_input());
    }
}
