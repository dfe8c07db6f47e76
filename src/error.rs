//! 统一的 API 错误类型与转换。

use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use tracing::warn;

use crate::storage::StorageError;

pub const UNAUTHORIZED_DETAIL: &str = "Incorrect username or password";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized,
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            ApiError::BadRequest(msg) | ApiError::Internal(msg) => {
                (status, Json(json!({ "detail": msg }))).into_response()
            }
            ApiError::Unauthorized => (
                status,
                [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Basic"))],
                Json(json!({ "detail": UNAUTHORIZED_DETAIL })),
            )
                .into_response(),
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::InvalidName(_) => ApiError::BadRequest(error.to_string()),
            StorageError::NotAFile(path) => {
                warn!(path = ?path, "destination exists and is not a regular file");
                ApiError::Internal("destination is not writable".into())
            }
            StorageError::Io(err) => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(error: MultipartError) -> Self {
        ApiError::BadRequest(error.body_text())
    }
}
