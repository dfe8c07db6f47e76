//! dev-upload-server binary.
//!
//! A small LAN upload server: `GET /` shows an upload form with example
//! command lines, `POST /` stores multipart files in the configured
//! directory, optionally behind HTTP Basic authentication.

mod atomic;
mod auth;
mod config;
mod error;
mod frontend;
mod http;
mod logging;
mod routes;
mod storage;
mod upload;

use axum_server::Handle;
use clap::{CommandFactory, Parser};
use shadow_rs::shadow;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use crate::config::{Args, SHUTDOWN_GRACE_SECS, ServerConfig};
use crate::frontend::{batch_usage, curl_usage};

shadow!(build);

/// Starts the upload server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging();

    let args = Args::parse();
    let config = match ServerConfig::from_args(&args) {
        Ok(config) => Arc::new(config),
        Err(err) => Args::command()
            .error(clap::error::ErrorKind::ValueValidation, err)
            .exit(),
    };

    info!("Will be saving files to {}", config.save_dir.display());
    let auth_hint = config
        .credentials
        .as_ref()
        .map(|creds| format!("-u '{}:<password>'", creds.username));
    info!(
        "cli usage:\n{}",
        curl_usage(&config.advertised_url, auth_hint.as_deref())
    );
    info!(
        "simple cli usage:\n{}",
        batch_usage(&config.advertised_url, auth_hint.as_deref())
    );

    let app = routes::build_router(config);
    let addr = SocketAddr::new(args.bind, args.port);
    let handle = Handle::new();

    info!("🚀 Starting HTTP server at {}", addr);
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

    info!("Received termination signal shutting down");
    handle.graceful_shutdown(Some(Duration::from_secs(SHUTDOWN_GRACE_SECS)));
}
