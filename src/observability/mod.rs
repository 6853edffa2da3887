//! Observability for Folio
//!
//! - Structured logging (JSON lines)
//! - Operational counters
//! - Named lifecycle events
//!
//! Observability never affects the outcome of an operation: logging
//! failures are swallowed and counters are advisory.
//!
//! # Usage
//!
//! ```ignore
//! use folio::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::VersionCreated, &[("chapter_id", "c1")]);
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};

/// Log a lifecycle event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
