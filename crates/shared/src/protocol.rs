use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ErrorCode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Error,
}

/// Envelope every backend endpoint answers with:
/// `{"status": "ok" | "error", "msg": "...", "data": ...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: ResponseStatus,
    #[serde(default)]
    pub msg: String,
    #[serde(default = "Option::default")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: ResponseStatus::Ok,
            msg: String::new(),
            data: Some(data),
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            status: ResponseStatus::Error,
            msg: msg.into(),
            data: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ResponseStatus::Ok
    }

    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        match self.status {
            ResponseStatus::Ok => Ok(self.data),
            ResponseStatus::Error => Err(ApiError::new(ErrorCode::classify(&self.msg), self.msg)),
        }
    }
}

/// Outcome of a single persistence call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteStatus {
    Ok,
    Failed { message: String },
}

impl WriteStatus {
    pub fn failed(message: impl Into<String>) -> Self {
        WriteStatus::Failed {
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, WriteStatus::Ok)
    }
}

impl<T> From<ApiResponse<T>> for WriteStatus {
    fn from(value: ApiResponse<T>) -> Self {
        match value.status {
            ResponseStatus::Ok => WriteStatus::Ok,
            ResponseStatus::Error => WriteStatus::Failed { message: value.msg },
        }
    }
}
