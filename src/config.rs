//! Store configuration
//!
//! Loaded from a JSON file; every field has a default so `{}` is a valid
//! configuration.
//!
//! ```text
//! {"log_level": "info", "log_target": "stdout", "max_document_depth": 32}
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::{LogSink, Logger, Severity};

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Log destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogTarget {
    Stdout,
    #[default]
    Stderr,
    None,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Minimum severity written to the log (default warn)
    #[serde(default = "default_log_level")]
    pub log_level: Severity,

    /// Log destination (default stderr)
    #[serde(default)]
    pub log_target: LogTarget,

    /// Nesting limit for inserted and replaced documents
    #[serde(default = "default_max_document_depth")]
    pub max_document_depth: usize,
}

fn default_log_level() -> Severity {
    Severity::Warn
}

fn default_max_document_depth() -> usize {
    100
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_target: LogTarget::default(),
            max_document_depth: default_max_document_depth(),
        }
    }
}

impl StoreConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;

        let config: StoreConfig = serde_json::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_document_depth == 0 {
            return Err(ConfigError::Invalid("max_document_depth must be > 0".into()));
        }
        Ok(())
    }

    /// Logger honoring `log_level` and `log_target`
    pub fn logger(&self) -> Logger {
        let sink = match self.log_target {
            LogTarget::Stdout => LogSink::Stdout,
            LogTarget::Stderr => LogSink::Stderr,
            LogTarget::None => LogSink::None,
        };
        Logger::new(self.log_level, sink)
    }

    pub fn with_max_document_depth(mut self, depth: usize) -> Self {
        self.max_document_depth = depth;
        self
    }
}
