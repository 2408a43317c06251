//! Observability subsystem
//!
//! This module provides:
//! - Structured logging (JSON lines)
//! - Typed lifecycle events
//! - Atomic counters
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use tvfexec::observability::{Event, Logger, MetricsRegistry, ObservationScope};
//!
//! Logger::info(Event::Registered.as_str(), &[("function", "explode")]);
//!
//! let metrics = MetricsRegistry::new();
//! metrics.increment_output_rows();
//!
//! let scope = ObservationScope::new("UDTF_EVAL");
//! // ... pull rows ...
//! scope.complete();
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::{ObservationScope, Timer, SCOPE_FAILURE_SEVERITY};

/// Log a lifecycle event with fields
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Warn
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
