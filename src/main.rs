//! fileshelf server binary.
//!
//! Serves one flat storage directory over HTTP: an upload form and listing
//! page, multipart upload, attachment download and delete. The main entry
//! point prepares the storage root, builds the Axum router and runs the
//! listener until a shutdown signal arrives.

mod atomic;
mod config;
mod error;
mod files;
mod frontend;
mod http;
mod logging;
mod router;
mod sanitize;
mod storage;
mod upload;
mod version;

use axum_server::Handle;
use clap::Parser;
use shadow_rs::shadow;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use crate::config::{Args, SHUTDOWN_GRACE_SECS, ServerConfig};
use crate::router::build_router;
use crate::storage::Storage;

shadow!(build);

/// Starts the server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging();

    let args = Args::parse();
    let storage = Arc::new(Storage::new(PathBuf::from(&args.storage_dir)));
    if let Err(err) = storage.ensure_root().await {
        error!(
            storage_dir = args.storage_dir,
            error = %err,
            "storage directory is not usable"
        );
        return Err(err);
    }
    info!(root = %storage.root_path().display(), "storage ready");

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let addr = SocketAddr::new(host, args.port);
    let app = build_router(storage, &ServerConfig::from(&args));
    let handle = Handle::new();

    info!("Starting HTTP server at http://{}", addr);

    tokio::spawn(shutdown_signal(handle.clone()));
    axum_server::bind(addr)
        .handle(handle)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received termination signal, shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(SHUTDOWN_GRACE_SECS)));
}
