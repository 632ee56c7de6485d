use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Unauthorized,
    Forbidden,
    NotFound,
    Validation,
    Internal,
}

impl ErrorCode {
    /// Best-effort classification of a backend `msg` string.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("please sign in") || lower.contains("unauthorized") {
            ErrorCode::Unauthorized
        } else if lower.contains("forbidden") || lower.contains("not allowed") {
            ErrorCode::Forbidden
        } else if lower.contains("not found") || lower.contains("does not exist") {
            ErrorCode::NotFound
        } else if lower.contains("invalid") || lower.contains("missing") {
            ErrorCode::Validation
        } else {
            ErrorCode::Internal
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
#[error("{code:?}: {message}")]
pub struct ApiException {
    pub code: ErrorCode,
    pub message: String,
}

impl From<ApiError> for ApiException {
    fn from(value: ApiError) -> Self {
        Self {
            code: value.code,
            message: value.message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PaneCountError {
    #[error("pane count {count} is outside 1..=4")]
    OutOfRange { count: u8 },
}
