//! Handler error kinds and their HTTP rendering.
//!
//! Every variant renders as `{"error": "..."}`. `Internal` carries detail for
//! the server log only; the client sees a fixed message.

use axum::extract::rejection::PathRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use serde::Serialize;
use std::io::ErrorKind;
use tracing::{error, warn};

use crate::storage::StorageError;

pub const NO_FILE_PART: &str = "no file part";
pub const NO_FILE_SELECTED: &str = "no file selected";
pub const INVALID_FILENAME: &str = "invalid filename";
pub const NOT_A_FILE: &str = "not a file";
pub const FILE_NOT_FOUND: &str = "file not found";
pub const INTERNAL_ERROR: &str = "internal server error";

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    PayloadTooLarge,
    MethodNotAllowed,
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::BadRequest(msg) | ApiError::NotFound(msg) => msg.as_str(),
            ApiError::PayloadTooLarge => "payload too large",
            ApiError::MethodNotAllowed => "method not allowed",
            ApiError::Internal(detail) => {
                error!(error = %detail, "request failed");
                INTERNAL_ERROR
            }
        };
        (status, JsonResponse(ErrorBody { error: message })).into_response()
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        warn!(reason = %rejection, "rejected path parameter");
        ApiError::BadRequest(INVALID_FILENAME.into())
    }
}

/// Fallback for paths that match no route.
pub async fn route_not_found() -> ApiError {
    ApiError::NotFound("not found".into())
}

/// Fallback for known paths requested with an unsupported method.
pub async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

impl From<StorageError> for ApiError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::InvalidName => ApiError::BadRequest(INVALID_FILENAME.into()),
            StorageError::NotAFile => ApiError::BadRequest(NOT_A_FILE.into()),
            StorageError::Io(err) => match err.kind() {
                ErrorKind::NotFound => ApiError::NotFound(FILE_NOT_FOUND.into()),
                _ => ApiError::Internal(err.to_string()),
            },
        }
    }
}
