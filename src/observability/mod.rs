//! Observability
//!
//! - Structured logging (JSON lines)
//! - Monotonic operation counters
//! - Typed engine events
//!
//! Observability is read-only: it never changes the outcome of an
//! operation and never fails one.
//!
//! ```ignore
//! use docstore::observability::{Event, Logger, Severity, LogSink};
//!
//! let logger = Logger::new(Severity::Info, LogSink::Stderr);
//! logger.event(Event::DocumentsInserted, &[("collection", "users"), ("count", "3")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{LogSink, Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
pub use scope::Timer;
