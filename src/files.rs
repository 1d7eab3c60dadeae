//! Listing, download and delete handlers.

use axum::body::Body as AxumBody;
use axum::extract::rejection::PathRejection;
use axum::extract::{Extension, Path};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{Html, IntoResponse, Json as JsonResponse, Response};
use httpdate::fmt_http_date;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::http::attachment_disposition;
use crate::storage::{FileEntry, Storage, StorageError};

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub status: &'static str,
    pub message: String,
}

/// Renders the listing page.
pub async fn index_page(
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<Html<String>, ApiError> {
    let entries = storage.list_entries().await?;
    info!(count = entries.len(), "render index");
    crate::frontend::render_index(&entries)
        .map(Html)
        .ok_or_else(|| ApiError::Internal("index template missing".into()))
}

/// Lists the storage root as JSON, in directory enumeration order.
pub async fn list_files(
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<JsonResponse<Vec<FileEntry>>, ApiError> {
    let entries = storage.list_entries().await?;
    info!(count = entries.len(), "list files");
    Ok(JsonResponse(entries))
}

/// Streams a stored file back as an attachment.
///
/// The attachment name is the sanitized name used for the lookup, never the
/// raw path segment.
pub async fn download_file(
    filename: Result<Path<String>, PathRejection>,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<Response, ApiError> {
    let Path(filename) = filename?;
    let (stored, file, metadata) = match storage.open_file(&filename).await {
        Ok(opened) => opened,
        Err(err) => {
            log_rejection("download", &filename, &err);
            return Err(err.into());
        }
    };

    let file_size = metadata.len();
    let mime = mime_guess::from_path(&stored.name).first_or_octet_stream();
    let header_error = |_: header::InvalidHeaderValue| {
        ApiError::Internal("failed to build response headers".into())
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.essence_str()).map_err(header_error)?,
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        attachment_disposition(&stored.name).map_err(header_error)?,
    );
    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&file_size.to_string()).map_err(header_error)?,
    );
    if let Ok(modified) = metadata.modified() {
        headers.insert(
            header::LAST_MODIFIED,
            HeaderValue::from_str(&fmt_http_date(modified)).map_err(header_error)?,
        );
    }

    info!(filename = stored.name, size = file_size, "download file");
    let stream = ReaderStream::new(file);
    Ok((StatusCode::OK, headers, AxumBody::from_stream(stream)).into_response())
}

/// Removes a stored file.
pub async fn delete_file(
    filename: Result<Path<String>, PathRejection>,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<JsonResponse<DeleteResponse>, ApiError> {
    let Path(filename) = filename?;
    let stored = match storage.delete_file(&filename).await {
        Ok(stored) => stored,
        Err(err) => {
            log_rejection("delete", &filename, &err);
            return Err(err.into());
        }
    };

    info!(filename = stored.name, "delete file");
    Ok(JsonResponse(DeleteResponse {
        status: "success",
        message: format!("file {} deleted", stored.name),
    }))
}

fn log_rejection(operation: &str, requested: &str, err: &StorageError) {
    match err {
        StorageError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
            warn!(operation, requested, "file does not exist");
        }
        StorageError::Io(_) => {}
        StorageError::InvalidName => warn!(operation, requested, "invalid filename"),
        StorageError::NotAFile => warn!(operation, requested, "target is not a file"),
    }
}
