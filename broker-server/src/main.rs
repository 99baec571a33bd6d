//! broker_server — standalone relay broker between a Device and its
//! Controllers.
//!
//! Reads config from env vars:
//!   API_PORT       — listen port (default: 3000)
//!   SCAN_DATA_DIR   — session store directory (default: ./scan-data)
//!   PUBLIC_DIR      — save-to-public destination (default: ./public)
//!   RUST_LOG / BROKER_LOG — tracing filter (default: info,broker_server=debug)

use std::sync::Arc;

use broker_core::Broker;
use broker_server::{config::Config, router::build_router, state::AppState};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() {
    let filter_directive = std::env::var("RUST_LOG")
        .or_else(|_| std::env::var("BROKER_LOG"))
        .unwrap_or_else(|_| "info,broker_server=debug".into());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter_directive))
        .init();

    let config = Config::from_env();
    let broker = Broker::new(config.scan_data_dir.clone());
    let state = AppState {
        broker,
        public_dir: Arc::new(config.public_dir.clone()),
    };

    let app = build_router(state);

    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {bind_addr}: {e}"));
    tracing::info!("broker_server listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    tracing::info!("shutdown signal received");
}
