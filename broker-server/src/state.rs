//! Shared axum state — the domain [`Broker`] handle plus server-only config
//! that handlers need but `broker-core` has no business knowing about.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::FromRef;
use broker_core::Broker;

#[derive(Clone)]
pub struct AppState {
    pub broker: Broker,
    pub public_dir: Arc<PathBuf>,
}

impl FromRef<AppState> for Broker {
    fn from_ref(state: &AppState) -> Self {
        state.broker.clone()
    }
}

impl FromRef<AppState> for Arc<PathBuf> {
    fn from_ref(state: &AppState) -> Self {
        Arc::clone(&state.public_dir)
    }
}
