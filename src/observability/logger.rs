//! Structured JSON logger
//!
//! - One log line = one event
//! - `event` first, then `severity`, then fields sorted by key
//! - Synchronous, no buffering
//! - Lines below the configured threshold are dropped

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use super::events::Event;

/// Log severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Per-operation detail
    Trace = 0,
    /// Normal operations
    Info = 1,
    /// Recoverable issues
    Warn = 2,
    /// Operation failures
    Error = 3,
    /// Unrecoverable
    Fatal = 4,
}

impl Severity {
    /// Returns the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Ok(Severity::Trace),
            "info" => Ok(Severity::Info),
            "warn" => Ok(Severity::Warn),
            "error" => Ok(Severity::Error),
            "fatal" => Ok(Severity::Fatal),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Where log lines go
#[derive(Debug, Clone, Default)]
pub enum LogSink {
    Stdout,
    #[default]
    Stderr,
    /// Discard everything
    None,
    /// Keep lines in memory (tests, embedding)
    Memory(Arc<Mutex<Vec<String>>>),
}

/// A structured logger that outputs JSON lines.
///
/// Owned by the store and shared with its collections; cloning shares the
/// same sink.
#[derive(Debug, Clone)]
pub struct Logger {
    threshold: Severity,
    sink: LogSink,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(Severity::Warn, LogSink::Stderr)
    }
}

impl Logger {
    pub fn new(threshold: Severity, sink: LogSink) -> Self {
        Self { threshold, sink }
    }

    /// Logger that drops every line
    pub fn disabled() -> Self {
        Self::new(Severity::Fatal, LogSink::None)
    }

    /// In-memory logger plus a handle to its captured lines
    pub fn capturing(threshold: Severity) -> (Self, Arc<Mutex<Vec<String>>>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        (Self::new(threshold, LogSink::Memory(Arc::clone(&lines))), lines)
    }

    pub fn threshold(&self) -> Severity {
        self.threshold
    }

    pub fn enabled(&self, severity: Severity) -> bool {
        !matches!(self.sink, LogSink::None) && severity >= self.threshold
    }

    /// Log an event with the given severity and fields
    pub fn log(&self, severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !self.enabled(severity) {
            return;
        }
        let line = Self::format_line(severity, event, fields);

        match &self.sink {
            LogSink::Stdout => Self::write_line(&mut io::stdout(), &line),
            LogSink::Stderr => Self::write_line(&mut io::stderr(), &line),
            LogSink::None => {}
            LogSink::Memory(lines) => lines
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(line),
        }
    }

    /// Log an engine event at its default severity
    pub fn event(&self, event: Event, fields: &[(&str, &str)]) {
        self.log(event.severity(), event.as_str(), fields);
    }

    fn format_line(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
        let mut sorted: Vec<_> = fields.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        let mut line = Map::new();
        line.insert("event".into(), JsonValue::from(event));
        line.insert("severity".into(), JsonValue::from(severity.as_str()));
        for (key, value) in sorted {
            line.insert((*key).to_string(), JsonValue::from(*value));
        }
        JsonValue::Object(line).to_string()
    }

    fn write_line<W: Write>(writer: &mut W, line: &str) {
        // logging never fails the operation being logged
        let _ = writeln!(writer, "{}", line);
        let _ = writer.flush();
    }

    pub fn trace(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Trace, event, fields);
    }

    pub fn info(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Info, event, fields);
    }

    pub fn warn(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Warn, event, fields);
    }

    pub fn error(&self, event: &str, fields: &[(&str, &str)]) {
        self.log(Severity::Error, event, fields);
    }
}
