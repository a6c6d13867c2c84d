//! Local development server for the org data visualizer.
//!
//! Serves the visualizer's static pages from a project root, keeps the
//! `/orgdata/` CSVs away from direct browser navigation, and exposes two
//! small helpers: the current OS username and an endpoint that persists the
//! access matrix CSV. Every response disables browser caching so edited data
//! files show up on the next fetch.

mod access;
mod app;
mod atomic;
mod config;
mod error;
mod files;
mod guard;
mod http;
mod identity;
mod logging;

use axum_server::Handle;
use clap::Parser;
use shadow_rs::shadow;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;

use crate::config::{Args, SiteConfig};
use crate::identity::{OsIdentity, SharedIdentity};

shadow!(build);

/// Starts the server and blocks until shutdown.
#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    logging::init_logging();

    let args = Args::parse();
    let site = Arc::new(SiteConfig::from_args(&args)?);
    let identity: SharedIdentity = Arc::new(OsIdentity);
    let app = app::build_router(site.clone(), identity, args.cors_origins.as_deref());

    let host = args
        .host
        .parse::<IpAddr>()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err.to_string()))?;
    let addr = SocketAddr::new(host, args.port);
    let handle = Handle::new();

    info!(
        root = %site.root.display(),
        access_file = %site.access_file.display(),
        "serving project root"
    );
    info!("🚀 Starting HTTP server at http://{}", addr);

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
    handle.graceful_shutdown(Some(Duration::from_secs(5)));
}
