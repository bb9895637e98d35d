//! Error types for docstore
//!
//! Every fallible engine operation returns `StoreResult<T>`. Errors are
//! reported to the immediate caller and never retried internally.
//!
//! Error codes:
//! - DOCSTORE_NOT_FOUND
//! - DOCSTORE_FIELD_PATH
//! - DOCSTORE_TYPE_MISMATCH
//! - DOCSTORE_INVALID_ARGUMENT
//! - DOCSTORE_DUPLICATE_KEY
//! - DOCSTORE_PARTIAL_BULK_FAILURE

use std::fmt;

use thiserror::Error;

use crate::bulk::BulkResult;

/// Stable error codes, one per error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreErrorCode {
    /// An operation expecting exactly one result found none
    NotFound,
    /// A dotted path traverses an incompatible value
    FieldPath,
    /// Operator applied to a field of the wrong variant
    TypeMismatch,
    /// Malformed filter, update, pipeline or option
    InvalidArgument,
    /// Identifier already present in the collection
    DuplicateKey,
    /// At least one operation of a bulk write failed
    PartialBulkFailure,
}

impl StoreErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "DOCSTORE_NOT_FOUND",
            Self::FieldPath => "DOCSTORE_FIELD_PATH",
            Self::TypeMismatch => "DOCSTORE_TYPE_MISMATCH",
            Self::InvalidArgument => "DOCSTORE_INVALID_ARGUMENT",
            Self::DuplicateKey => "DOCSTORE_DUPLICATE_KEY",
            Self::PartialBulkFailure => "DOCSTORE_PARTIAL_BULK_FAILURE",
        }
    }
}

impl fmt::Display for StoreErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Engine error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// No document satisfied the filter
    #[error("No matching document: {0}")]
    NotFound(String),

    /// Dotted path crosses a value that is neither a document nor missing
    #[error("Cannot traverse field path '{path}': {reason}")]
    FieldPath { path: String, reason: String },

    /// Operator target has the wrong variant
    #[error("Type mismatch on '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Malformed specification or argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Identifier collision on insert
    #[error("Duplicate _id: {0}")]
    DuplicateKey(String),

    /// Bulk write finished with failures; carries every per-operation outcome
    #[error("Bulk write failed: {} of {} operations failed", .0.errors.len(), .0.outcomes.len())]
    PartialBulkFailure(Box<BulkResult>),
}

impl StoreError {
    /// Create a not found error
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create a field path error
    pub fn field_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FieldPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(path: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected,
            found,
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Returns the error code
    pub fn code(&self) -> StoreErrorCode {
        match self {
            Self::NotFound(_) => StoreErrorCode::NotFound,
            Self::FieldPath { .. } => StoreErrorCode::FieldPath,
            Self::TypeMismatch { .. } => StoreErrorCode::TypeMismatch,
            Self::InvalidArgument(_) => StoreErrorCode::InvalidArgument,
            Self::DuplicateKey(_) => StoreErrorCode::DuplicateKey,
            Self::PartialBulkFailure(_) => StoreErrorCode::PartialBulkFailure,
        }
    }

    /// Returns true for `NotFound`, which callers may treat as an empty result
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Returns the bulk result carried by a partial bulk failure
    pub fn bulk_result(&self) -> Option<&BulkResult> {
        match self {
            Self::PartialBulkFailure(result) => Some(result),
            _ => None,
        }
    }
}

/// Result type for engine operations
pub type StoreResult<T> = Result<T, StoreError>;
