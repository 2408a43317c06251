//! ObservationScope for automatic begin/complete logging
//!
//! - Logs `{name}_BEGIN` on creation
//! - Logs `{name}_COMPLETE` on `complete`
//! - Logs `{name}_FAILED` on `fail`
//! - Logs `{name}_INCOMPLETE` on drop if neither was called

use std::time::Instant;

use super::logger::{Logger, Severity};

/// Severity of `{name}_FAILED`. The failure itself is logged at ERROR by
/// whoever reports it.
pub const SCOPE_FAILURE_SEVERITY: Severity = Severity::Warn;

/// A scope that automatically logs begin and complete events
///
/// Begin/complete are logged at the scope's severity, so per-row scopes can
/// run at TRACE while per-query scopes run at INFO.
pub struct ObservationScope {
    name: String,
    severity: Severity,
    completed: bool,
    fields: Vec<(&'static str, String)>,
}

impl ObservationScope {
    /// Create a new INFO scope
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_fields(name, Severity::Info, Vec::new())
    }

    /// Create a new scope with fields repeated on every event
    pub fn with_fields(
        name: impl Into<String>,
        severity: Severity,
        fields: Vec<(&'static str, String)>,
    ) -> Self {
        let scope = Self {
            name: name.into(),
            severity,
            completed: false,
            fields,
        };
        scope.emit(severity, "BEGIN", &[]);
        scope
    }

    fn emit(&self, severity: Severity, suffix: &str, extra: &[(&str, &str)]) {
        if !Logger::enabled(severity) {
            return;
        }
        let event = format!("{}_{}", self.name, suffix);
        let mut all: Vec<(&str, &str)> = self.fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
        all.extend(extra.iter().copied());
        Logger::log(severity, &event, &all);
    }

    /// Mark the scope as successfully completed
    pub fn complete(self) {
        self.complete_with_fields(&[]);
    }

    /// Mark the scope as successfully completed with additional fields
    pub fn complete_with_fields(mut self, extra_fields: &[(&str, &str)]) {
        self.completed = true;
        self.emit(self.severity, "COMPLETE", extra_fields);
    }

    /// Mark the scope as failed with a reason
    pub fn fail(mut self, reason: &str) {
        self.completed = true;
        self.emit(SCOPE_FAILURE_SEVERITY, "FAILED", &[("reason", reason)]);
    }

    /// Check if the scope has been completed
    pub fn is_completed(&self) -> bool {
        self.completed
    }
}

impl Drop for ObservationScope {
    fn drop(&mut self) {
        if !self.completed {
            self.emit(
                Severity::Warn,
                "INCOMPLETE",
                &[("reason", "scope dropped without completion")],
            );
        }
    }
}

/// A simple duration timer for logging elapsed time
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Create a new timer
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Elapsed milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
