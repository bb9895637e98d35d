//! API error types
//!
//! API errors pass engine error codes through unchanged; only request
//! envelope problems get API-specific codes.

use std::fmt;

use serde_json::Value as JsonValue;

use crate::errors::StoreError;

/// API-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorCode {
    /// Request is not valid JSON or lacks a required key
    InvalidRequest,
    /// Unknown `op`
    UnknownOperation,
    /// Response could not be serialized
    Internal,
}

impl ApiErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ApiErrorCode::InvalidRequest => "DOCSTORE_API_INVALID_REQUEST",
            ApiErrorCode::UnknownOperation => "DOCSTORE_API_UNKNOWN_OPERATION",
            ApiErrorCode::Internal => "DOCSTORE_API_INTERNAL",
        }
    }
}

impl fmt::Display for ApiErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// API error with the originating error code preserved
#[derive(Debug, Clone)]
pub struct ApiError {
    code: String,
    message: String,
    /// Extra structured payload (per-operation bulk outcomes)
    details: Option<JsonValue>,
}

impl ApiError {
    fn new(code: ApiErrorCode, message: impl Into<String>) -> Self {
        Self {
            code: code.code().to_string(),
            message: message.into(),
            details: None,
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::InvalidRequest, reason)
    }

    /// Create an unknown operation error
    pub fn unknown_operation(op: impl Into<String>) -> Self {
        Self::new(
            ApiErrorCode::UnknownOperation,
            format!("Unknown operation: {}", op.into()),
        )
    }

    pub fn internal(reason: impl Into<String>) -> Self {
        Self::new(ApiErrorCode::Internal, reason)
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> Option<&JsonValue> {
        self.details.as_ref()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self {
            code: err.code().code().to_string(),
            message: err.to_string(),
            details: None,
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("serialization failed: {}", err))
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
