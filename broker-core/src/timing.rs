//! Timing tracker (§4.2) — per-command queued/sent/received instants and
//! derived latencies, with a 60 s post-completion cleanup.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::clock::now_millis;

const CLEANUP_AFTER_MS: u64 = 60_000;

#[derive(Debug, Clone, Default)]
struct TimingRecord {
    queued_at: i64,
    sent_at: Option<i64>,
    received_at: Option<i64>,
    tv_processing_time_ms: Option<i64>,
}

/// Read-only snapshot returned to callers; never aliases the internal map.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimingSnapshot {
    pub queued_at: i64,
    pub sent_at: Option<i64>,
    pub received_at: Option<i64>,
    pub queue_wait_ms: Option<i64>,
    pub round_trip_ms: Option<i64>,
    pub total_ms: Option<i64>,
    pub tv_processing_time_ms: Option<i64>,
}

impl From<&TimingRecord> for TimingSnapshot {
    fn from(r: &TimingRecord) -> Self {
        Self {
            queued_at: r.queued_at,
            sent_at: r.sent_at,
            received_at: r.received_at,
            queue_wait_ms: r.sent_at.map(|s| s - r.queued_at),
            round_trip_ms: match (r.sent_at, r.received_at) {
                (Some(s), Some(rcv)) => Some(rcv - s),
                _ => None,
            },
            total_ms: r.received_at.map(|rcv| rcv - r.queued_at),
            tv_processing_time_ms: r.tv_processing_time_ms,
        }
    }
}

/// Report returned by [`TimingTracker::track_received_from_tv`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedReport {
    pub queue_wait_ms: Option<i64>,
    pub round_trip_ms: Option<i64>,
    pub tv_processing_time_ms: Option<i64>,
    pub total_ms: Option<i64>,
}

/// Tracks per-command timing. Cheap, `Clone`-able handle over shared state.
#[derive(Clone)]
pub struct TimingTracker {
    records: Arc<Mutex<HashMap<String, TimingRecord>>>,
}

impl Default for TimingTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingTracker {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Idempotent: a second call for the same id overwrites the record.
    pub async fn track_queued(&self, id: &str) {
        let mut records = self.records.lock().await;
        records.insert(
            id.to_string(),
            TimingRecord {
                queued_at: now_millis(),
                ..Default::default()
            },
        );
    }

    /// Returns `queueWaitMs`, or `None` if the command was never tracked as queued.
    pub async fn track_sent_to_tv(&self, id: &str) -> Option<i64> {
        let mut records = self.records.lock().await;
        let record = records.get_mut(id)?;
        let sent_at = now_millis();
        record.sent_at = Some(sent_at);
        Some(sent_at - record.queued_at)
    }

    pub async fn track_received_from_tv(
        &self,
        id: &str,
        tv_processing_time_ms: Option<i64>,
    ) -> Option<ReceivedReport> {
        let mut records = self.records.lock().await;
        let record = records.get_mut(id)?;
        let received_at = now_millis();
        record.received_at = Some(received_at);
        record.tv_processing_time_ms = tv_processing_time_ms;
        Some(ReceivedReport {
            queue_wait_ms: record.sent_at.map(|s| s - record.queued_at),
            round_trip_ms: record.sent_at.map(|s| received_at - s),
            tv_processing_time_ms,
            total_ms: Some(received_at - record.queued_at),
        })
    }

    pub async fn get_timing(&self, id: &str) -> Option<TimingSnapshot> {
        let records = self.records.lock().await;
        records.get(id).map(TimingSnapshot::from)
    }

    pub async fn get_total_time(&self, id: &str) -> Option<i64> {
        self.get_timing(id).await.and_then(|t| t.total_ms)
    }

    /// Schedules removal of the record `after` from now. Tolerant of the
    /// record already being gone; never blocks the caller.
    pub fn schedule_cleanup(&self, id: String) {
        self.schedule_cleanup_after(id, Duration::from_millis(CLEANUP_AFTER_MS));
    }

    pub fn schedule_cleanup_after(&self, id: String, after: Duration) {
        let records = Arc::clone(&self.records);
        tokio::spawn(async move {
            tokio::time::sleep(after).await;
            records.lock().await.remove(&id);
        });
    }

    /// Evicts a record immediately, e.g. on an explicit failure drain.
    pub async fn drop_record(&self, id: &str) {
        self.records.lock().await.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_wait_is_none_until_sent() {
        let tracker = TimingTracker::new();
        tracker.track_queued("c1").await;
        let snap = tracker.get_timing("c1").await.unwrap();
        assert!(snap.queue_wait_ms.is_none());
    }

    #[tokio::test]
    async fn full_lifecycle_derives_all_latencies() {
        let tracker = TimingTracker::new();
        tracker.track_queued("c1").await;
        tokio::time::sleep(Duration::from_millis(2)).await;
        let wait = tracker.track_sent_to_tv("c1").await;
        assert!(wait.is_some());
        tokio::time::sleep(Duration::from_millis(2)).await;
        let report = tracker
            .track_received_from_tv("c1", Some(4))
            .await
            .unwrap();
        assert!(report.round_trip_ms.unwrap() >= 0);
        assert_eq!(report.tv_processing_time_ms, Some(4));
        assert!(report.total_ms.unwrap() >= report.round_trip_ms.unwrap());
    }

    #[tokio::test]
    async fn unknown_id_tracks_as_none() {
        let tracker = TimingTracker::new();
        assert!(tracker.track_sent_to_tv("ghost").await.is_none());
        assert!(tracker.get_timing("ghost").await.is_none());
    }

    #[tokio::test]
    async fn cleanup_after_interval_removes_record_without_failing_reads() {
        let tracker = TimingTracker::new();
        tracker.track_queued("c1").await;
        tracker.schedule_cleanup_after("c1".to_string(), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(tracker.get_timing("c1").await.is_none());
    }
}
