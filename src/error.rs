use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{error, warn};

use crate::assistant::ProcessError;
use crate::inventory::InventoryError;
use crate::uploads::UploadError;

/// Error body returned by `/ask` and `/audio`:
/// `{ error, code?, stderr?, details? }`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest {
        message: String,
        details: Option<String>,
    },
    SpawnFailed(String),
    ProcessFailed {
        code: Option<i32>,
        stderr: String,
    },
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::BadRequest {
            message: msg.into(),
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest { message, details } => {
                let mut body = json!({ "error": message });
                if let Some(details) = details {
                    body["details"] = json!(details);
                }
                (StatusCode::BAD_REQUEST, body)
            }
            ApiError::SpawnFailed(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Failed to start assistant process",
                    "details": details,
                }),
            ),
            ApiError::ProcessFailed { code, stderr } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Assistant process failed",
                    "code": code,
                    "stderr": stderr,
                }),
            ),
            ApiError::Internal(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "Internal server error",
                    "details": details,
                }),
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<ProcessError> for ApiError {
    fn from(err: ProcessError) -> Self {
        error!("{}", err);
        match err {
            ProcessError::Spawn { message } => ApiError::SpawnFailed(message),
            ProcessError::Failed { code, stderr } => ApiError::ProcessFailed { code, stderr },
        }
    }
}

impl From<InventoryError> for ApiError {
    fn from(err: InventoryError) -> Self {
        error!("Inventory fetch failed: {}", err);
        ApiError::Internal(err.to_string())
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Missing => {
                warn!("Rejected /audio request without an audio field");
                ApiError::bad_request(UploadError::Missing.to_string())
            }
            UploadError::Multipart(details) => {
                error!("Rejected multipart body: {}", details);
                ApiError::BadRequest {
                    message: "Invalid upload".to_string(),
                    details: Some(details),
                }
            }
            UploadError::Io(e) => {
                error!("Failed to store upload: {}", e);
                ApiError::Internal(e.to_string())
            }
        }
    }
}
