//! Function registry (§4.5) — latest uploaded function inventory, served
//! through a liveness-gated read projection.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::clock::now_millis;
use crate::liveness::LivenessTracker;
use crate::types::{ConnectionInfo, FunctionEntry};

#[derive(Debug, Clone, Default)]
struct Inventory {
    functions: Vec<FunctionEntry>,
    device_info: Option<Value>,
    last_uploaded_at: Option<i64>,
}

/// Read-side projection returned by [`FunctionRegistry::read`].
#[derive(Debug, Clone)]
pub struct RegistryView {
    pub functions: Vec<FunctionEntry>,
    pub device_info: Option<Value>,
    pub last_uploaded_at: Option<i64>,
    pub connection_info: ConnectionInfo,
}

#[derive(Clone)]
pub struct FunctionRegistry {
    inner: Arc<Mutex<Inventory>>,
    liveness: LivenessTracker,
}

impl FunctionRegistry {
    pub fn new(liveness: LivenessTracker) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inventory::default())),
            liveness,
        }
    }

    /// Replaces the prior inventory wholesale — no merging.
    pub async fn upload(&self, functions: Vec<FunctionEntry>, device_info: Option<Value>) {
        let mut inner = self.inner.lock().await;
        inner.functions = functions;
        inner.device_info = device_info;
        inner.last_uploaded_at = Some(now_millis());
    }

    /// Projects `functions`/`deviceInfo` as empty/absent whenever the Device
    /// is not alive; `connectionInfo` always reflects the effective state.
    pub async fn read(&self) -> RegistryView {
        let alive = self.liveness.is_alive().await;
        let connection_info = self.liveness.get_status().await;
        let inner = self.inner.lock().await;
        if alive {
            RegistryView {
                functions: inner.functions.clone(),
                device_info: inner.device_info.clone(),
                last_uploaded_at: inner.last_uploaded_at,
                connection_info,
            }
        } else {
            RegistryView {
                functions: Vec::new(),
                device_info: None,
                last_uploaded_at: inner.last_uploaded_at,
                connection_info,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> FunctionEntry {
        FunctionEntry {
            name: name.to_string(),
            parameters: vec![],
            source_code: None,
            description: None,
            available: Some(true),
        }
    }

    #[tokio::test]
    async fn upload_replaces_prior_inventory_wholesale() {
        let liveness = LivenessTracker::new();
        liveness.touch("10.0.0.1", None).await;
        let registry = FunctionRegistry::new(liveness);

        registry.upload(vec![entry("a"), entry("b")], None).await;
        registry.upload(vec![entry("c")], None).await;

        let view = registry.read().await;
        assert_eq!(view.functions.len(), 1);
        assert_eq!(view.functions[0].name, "c");
    }

    #[tokio::test]
    async fn stale_device_projects_empty_inventory() {
        let liveness = LivenessTracker::new();
        let registry = FunctionRegistry::new(liveness);
        registry.upload(vec![entry("a")], None).await;

        let view = registry.read().await;
        assert!(view.functions.is_empty());
        assert!(view.device_info.is_none());
        assert!(!view.connection_info.connected);
    }
}
