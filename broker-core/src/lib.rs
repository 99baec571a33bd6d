//! `broker-core` — the command relay broker's domain state machine.
//!
//! Transport-agnostic: nothing here knows about HTTP. `broker-server` wires
//! this crate's [`Broker`] handle into an axum router.

pub mod clock;
pub mod error;
pub mod liveness;
pub mod registry;
pub mod relay;
pub mod session;
pub mod timing;
pub mod types;

use std::path::PathBuf;

use liveness::LivenessTracker;
use registry::FunctionRegistry;
use relay::CommandRelay;
use session::SessionStore;
use timing::TimingTracker;

/// The single, process-wide broker object (§9: "exactly one Device per
/// broker instance"). Cheap to clone — every field is itself a cheap
/// `Clone`-able handle over shared state, except [`SessionStore`] which is
/// held behind an `Arc`.
#[derive(Clone)]
pub struct Broker {
    pub liveness: LivenessTracker,
    pub relay: std::sync::Arc<CommandRelay>,
    pub registry: FunctionRegistry,
    pub sessions: std::sync::Arc<SessionStore>,
}

impl Broker {
    pub fn new(scan_data_dir: impl Into<PathBuf>) -> Self {
        let liveness = LivenessTracker::new();
        let timing = TimingTracker::new();
        Self {
            relay: std::sync::Arc::new(CommandRelay::new(timing, liveness.clone())),
            registry: FunctionRegistry::new(liveness.clone()),
            sessions: std::sync::Arc::new(SessionStore::new(scan_data_dir)),
            liveness,
        }
    }
}
