//! Liveness tracker (§4.3) — single shared [`ConnectionInfo`] with
//! sliding-window staleness and lazy eviction.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::clock::now_millis;
use crate::types::ConnectionInfo;

/// A Device is considered stale after this many milliseconds without ingress.
pub const STALE_AFTER_MS: i64 = 600_000;

#[derive(Clone)]
pub struct LivenessTracker {
    inner: Arc<Mutex<ConnectionInfo>>,
}

impl Default for LivenessTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessTracker {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ConnectionInfo::default())),
        }
    }

    /// Called on every Device-originated request. Sets `connected=true`,
    /// `lastSeen=now`, and preserves a previously set `deviceInfo` unless
    /// none has been recorded yet.
    pub async fn touch(&self, ip_address: &str, device_info: Option<Value>) {
        let mut info = self.inner.lock().await;
        info.connected = true;
        info.last_seen = Some(now_millis());
        info.ip_address = ip_address.to_string();
        if info.device_info.is_none() {
            info.device_info = device_info;
        }
    }

    /// `true` iff `connected ∧ (now − lastSeen < STALE_AFTER_MS)`.
    ///
    /// A `false` result while `connected` was still `true` lazily evicts the
    /// connection (transitions `connected → false`) — no background timer.
    pub async fn is_alive(&self) -> bool {
        let mut info = self.inner.lock().await;
        let alive = info.connected
            && info
                .last_seen
                .map(|seen| now_millis() - seen < STALE_AFTER_MS)
                .unwrap_or(false);
        if !alive && info.connected {
            info.connected = false;
        }
        alive
    }

    /// Public status projection; also lazily evicts a stale connection.
    pub async fn get_status(&self) -> ConnectionInfo {
        let _ = self.is_alive().await;
        self.inner.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn never_touched_is_not_alive() {
        let tracker = LivenessTracker::new();
        assert!(!tracker.is_alive().await);
    }

    #[tokio::test]
    async fn touched_device_is_alive() {
        let tracker = LivenessTracker::new();
        tracker.touch("10.0.0.1", None).await;
        assert!(tracker.is_alive().await);
    }

    #[tokio::test]
    async fn device_info_is_preserved_once_set() {
        let tracker = LivenessTracker::new();
        tracker
            .touch("10.0.0.1", Some(serde_json::json!({"model": "x"})))
            .await;
        tracker.touch("10.0.0.1", None).await;
        let status = tracker.get_status().await;
        assert_eq!(status.device_info, Some(serde_json::json!({"model": "x"})));
    }

    #[tokio::test]
    async fn device_info_is_not_replaced_by_a_later_distinct_value() {
        let tracker = LivenessTracker::new();
        tracker
            .touch("10.0.0.1", Some(serde_json::json!({"model": "x"})))
            .await;
        tracker
            .touch("10.0.0.1", Some(serde_json::json!({"model": "y"})))
            .await;
        let status = tracker.get_status().await;
        assert_eq!(status.device_info, Some(serde_json::json!({"model": "x"})));
    }

    #[tokio::test]
    async fn lazy_eviction_flips_connected_after_stale_window() {
        let tracker = LivenessTracker::new();
        tracker.touch("10.0.0.1", None).await;
        {
            let mut info = tracker.inner.lock().await;
            info.last_seen = Some(now_millis() - STALE_AFTER_MS - 1);
        }
        assert!(!tracker.is_alive().await);
        let status = tracker.get_status().await;
        assert!(!status.connected);
    }
}
