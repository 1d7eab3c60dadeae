//! Multipart upload handler.

use axum::extract::multipart::{Field, MultipartError, MultipartRejection};
use axum::extract::{Extension, Multipart};
use axum::http::StatusCode;
use axum::response::Json as JsonResponse;
use serde::Serialize;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::error::{ApiError, INVALID_FILENAME, NO_FILE_PART, NO_FILE_SELECTED};
use crate::sanitize::sanitize_filename;
use crate::storage::{Storage, StorageError};

pub const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub status: &'static str,
    pub filename: String,
}

/// Stores the `file` field of a multipart form under its sanitized name.
///
/// Only a part with a `filename` parameter counts as the file part; a plain
/// form value named `file` is skipped. An existing file with the same
/// sanitized name is replaced.
pub async fn upload_file(
    Extension(storage): Extension<Arc<Storage>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<JsonResponse<UploadResponse>, ApiError> {
    let mut multipart = match multipart {
        Ok(multipart) => multipart,
        Err(rejection) => {
            warn!(reason = %rejection, "upload without multipart body");
            return Err(ApiError::BadRequest(NO_FILE_PART.into()));
        }
    };

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some(FILE_FIELD) && field.file_name().is_some() {
            return store_field(&storage, field).await;
        }
    }

    warn!("upload without file part");
    Err(ApiError::BadRequest(NO_FILE_PART.into()))
}

async fn store_field(
    storage: &Storage,
    mut field: Field<'_>,
) -> Result<JsonResponse<UploadResponse>, ApiError> {
    let original = field.file_name().unwrap_or_default().to_string();
    // Browsers send `filename=""` when the file input was left empty.
    if original.is_empty() {
        warn!("upload with empty filename");
        return Err(ApiError::BadRequest(NO_FILE_SELECTED.into()));
    }
    if sanitize_filename(&original).is_none() {
        warn!(original, "upload rejected, filename unusable");
        return Err(ApiError::BadRequest(INVALID_FILENAME.into()));
    }

    let (stored, mut atomic) = storage
        .begin_write(&original)
        .await
        .map_err(|err| match err {
            StorageError::Io(err) => ApiError::Internal(err.to_string()),
            other => other.into(),
        })?;
    let write_result: Result<u64, ApiError> = async {
        let mut written: u64 = 0;
        while let Some(chunk) = field.chunk().await.map_err(multipart_error)? {
            atomic
                .file_mut()
                .write_all(&chunk)
                .await
                .map_err(|err| ApiError::Internal(err.to_string()))?;
            written += chunk.len() as u64;
        }
        Ok(written)
    }
    .await;

    let size = match write_result {
        Ok(size) => size,
        Err(err) => {
            atomic.cleanup().await;
            warn!(filename = stored.name, "upload aborted");
            return Err(err);
        }
    };
    atomic
        .finalize()
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;

    info!(filename = stored.name, original, size, "upload file");
    Ok(JsonResponse(UploadResponse {
        status: "success",
        filename: stored.name,
    }))
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::PayloadTooLarge;
    }
    warn!(error = %err.body_text(), "malformed multipart body");
    ApiError::BadRequest("malformed multipart body".into())
}
