pub mod commands;
pub mod functions;
pub mod health;
pub mod keepalive;
pub mod save_to_public;
pub mod sessions;

use axum::http::HeaderMap;

/// Best-effort client IP extraction from reverse-proxy headers. TLS
/// termination and exact transport framing are out of scope (§1); this
/// broker is assumed to sit behind a proxy that sets one of these headers.
pub(crate) fn client_ip(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .map(|v| v.to_string())
        })
        .unwrap_or_else(|| "unknown".to_string())
}
