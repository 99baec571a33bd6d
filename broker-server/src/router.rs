//! Router construction for the broker server.

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Body size ceiling for every request (§6: `Content-Length` <= 10 MiB).
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/api/functions", post(handlers::functions::upload).get(handlers::functions::list))
        .route("/api/keepalive", post(handlers::keepalive::keepalive))
        .route("/api/save-to-public", post(handlers::save_to_public::save_to_public))
        .route("/api/remote-command", post(handlers::commands::enqueue).get(handlers::commands::dispatch_single))
        .route("/api/remote-command-batch", get(handlers::commands::dispatch_batch))
        .route("/api/execute-response", post(handlers::commands::post_result))
        .route("/api/execute-response/:id", get(handlers::commands::drain_result))
        .route("/api/scan/session/save", post(handlers::sessions::save))
        .route("/api/scan/sessions", get(handlers::sessions::list))
        .route("/api/scan/session/load/:id", get(handlers::sessions::load))
        .route("/api/scan/session/resume/:id", get(handlers::sessions::resume))
        .route("/api/scan/session/delete/:id", delete(handlers::sessions::delete))
        .route("/api/health", get(handlers::health::health));

    routes
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
