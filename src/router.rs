//! Route table and middleware stack.

use axum::extract::{DefaultBodyLimit, Extension, connect_info::ConnectInfo};
use axum::http::Request;
use axum::routing::{get, post};
use axum::{Router, middleware};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, info_span};

use crate::config::ServerConfig;
use crate::http::{add_security_headers, build_cors_layer, resolve_client_ip};
use crate::storage::Storage;
use crate::{error, files, upload, version};

/// Builds the application router around an already prepared `Storage`.
pub fn build_router(storage: Arc<Storage>, config: &ServerConfig) -> Router {
    let body_limit = match usize::try_from(config.max_upload_size) {
        Ok(0) => DefaultBodyLimit::disable(),
        Ok(limit) => DefaultBodyLimit::max(limit),
        Err(_) => DefaultBodyLimit::disable(),
    };

    let mut app = Router::new()
        .route("/", get(files::index_page))
        .route("/api/files", get(files::list_files))
        .route("/api/version", get(version::get_version_info))
        .route("/upload", post(upload::upload_file).layer(body_limit))
        .route("/download/{filename}", get(files::download_file))
        .route("/delete/{filename}", post(files::delete_file))
        .method_not_allowed_fallback(error::method_not_allowed)
        .fallback(error::route_not_found)
        .layer(middleware::from_fn(add_security_headers))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request<_>| {
                    let connect_ip = request
                        .extensions()
                        .get::<ConnectInfo<SocketAddr>>()
                        .map(|ConnectInfo(addr)| addr.ip());
                    let client_ip = resolve_client_ip(request.headers(), connect_ip)
                        .map(|ip| ip.to_string())
                        .unwrap_or_else(|| "unknown".to_string());

                    info_span!(
                        "request",
                        client_ip,
                        method = ?request.method(),
                        path = ?request.uri().path(),
                    )
                })
                .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(Extension(storage));

    if let Some(cors_layer) = build_cors_layer(config.cors_origins.as_deref()) {
        app = app.layer(cors_layer);
    }

    app
}
