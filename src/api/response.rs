//! API response types
//!
//! ```text
//! {"status":"ok","data":...}
//! {"status":"error","code":"DOCSTORE_NOT_FOUND","message":"..."}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::errors::ApiError;

/// Success response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub status: String,
    pub data: Value,
}

impl SuccessResponse {
    pub fn new(data: Value) -> Self {
        Self {
            status: "ok".to_string(),
            data,
        }
    }

    pub fn to_value(&self) -> Value {
        json!({"status": self.status, "data": self.data})
    }
}

/// Error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorResponse {
    /// Create from an API error
    pub fn from_error(err: &ApiError) -> Self {
        Self {
            status: "error".to_string(),
            code: err.code().to_string(),
            message: err.message().to_string(),
            details: err.details().cloned(),
        }
    }

    pub fn to_value(&self) -> Value {
        let mut value = json!({
            "status": self.status,
            "code": self.code,
            "message": self.message,
        });
        if let (Some(details), Some(obj)) = (&self.details, value.as_object_mut()) {
            obj.insert("details".to_string(), details.clone());
        }
        value
    }
}

/// Unified response type
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Success(SuccessResponse),
    Error(ErrorResponse),
}

impl Response {
    pub fn success(data: Value) -> Self {
        Response::Success(SuccessResponse::new(data))
    }

    pub fn error(err: &ApiError) -> Self {
        Response::Error(ErrorResponse::from_error(err))
    }

    pub fn to_value(&self) -> Value {
        match self {
            Response::Success(r) => r.to_value(),
            Response::Error(r) => r.to_value(),
        }
    }

    /// One-line JSON rendering
    pub fn to_json(&self) -> String {
        self.to_value().to_string()
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Response::Success(_))
    }
}
