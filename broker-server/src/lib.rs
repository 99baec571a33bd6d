//! `broker-server` — axum HTTP adapter over [`broker_core::Broker`].

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
