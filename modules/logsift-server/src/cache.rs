//! Stats/projection cache: in-memory counters plus the ordered mirror of
//! accepted events, all under one RwLock. Query endpoints read only this,
//! never the queue or the store.
//!
//! Each accepted event's counter bump and mirror append happen inside a
//! single lock acquisition, so readers never observe a partially-applied
//! event.

use std::collections::HashSet;

use tokio::sync::RwLock;

use logsift_common::{Event, StatsSnapshot};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Counters {
    pub received: u64,
    pub unique_processed: u64,
    pub duplicate_dropped: u64,
    /// Internal only: persistence failures folded into `duplicate_dropped`
    /// on the wire. Kept separate here so failures stay diagnosable.
    pub persist_failed: u64,
}

#[derive(Default)]
struct CacheInner {
    counters: Counters,
    events: Vec<Event>,
}

#[derive(Default)]
pub struct ProjectionCache {
    inner: RwLock<CacheInner>,
}

impl ProjectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the mirror and reconcile `unique_processed` from durable
    /// state. `received` is deliberately not restored; it restarts at zero.
    pub async fn restore(&self, events: Vec<Event>, unique_processed: u64) {
        let mut inner = self.inner.write().await;
        inner.events = events;
        inner.counters.unique_processed = unique_processed;
    }

    /// Count events submitted to the pipeline, before they are enqueued.
    pub async fn add_received(&self, n: u64) {
        self.inner.write().await.counters.received += n;
    }

    pub async fn record_duplicate(&self) {
        self.inner.write().await.counters.duplicate_dropped += 1;
    }

    /// A processing failure: dropped and counted under `duplicate_dropped`
    /// for wire compatibility, tracked separately as `persist_failed`.
    pub async fn record_persist_failure(&self) {
        let mut inner = self.inner.write().await;
        inner.counters.duplicate_dropped += 1;
        inner.counters.persist_failed += 1;
    }

    /// Append an accepted event and bump `unique_processed` atomically.
    pub async fn record_accepted(&self, event: Event) {
        let mut inner = self.inner.write().await;
        inner.events.push(event);
        inner.counters.unique_processed += 1;
    }

    pub async fn counters(&self) -> Counters {
        self.inner.read().await.counters
    }

    /// Accepted events, optionally filtered by topic, sorted ascending by
    /// `received_at` (falling back to the producer timestamp). The sort is
    /// stable, so equal keys keep insertion order.
    pub async fn events_sorted(&self, topic: Option<&str>) -> Vec<Event> {
        let inner = self.inner.read().await;
        let mut events: Vec<Event> = match topic {
            Some(topic) => inner
                .events
                .iter()
                .filter(|e| e.topic == topic)
                .cloned()
                .collect(),
            None => inner.events.clone(),
        };
        events.sort_by(|a, b| a.sort_key().cmp(b.sort_key()));
        events
    }

    pub async fn snapshot(&self, uptime: f64) -> StatsSnapshot {
        let inner = self.inner.read().await;
        let topics: HashSet<&str> = inner.events.iter().map(|e| e.topic.as_str()).collect();
        StatsSnapshot {
            received: inner.counters.received,
            unique_processed: inner.counters.unique_processed,
            duplicate_dropped: inner.counters.duplicate_dropped,
            topics: topics.into_iter().map(String::from).collect(),
            uptime,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn event(topic: &str, event_id: &str, timestamp: &str, received_at: Option<&str>) -> Event {
        Event {
            topic: topic.to_string(),
            event_id: event_id.to_string(),
            timestamp: timestamp.to_string(),
            source: "s".to_string(),
            payload: Map::new(),
            received_at: received_at.map(String::from),
        }
    }

    #[tokio::test]
    async fn restore_reconciles_unique_but_not_received() {
        let cache = ProjectionCache::new();
        cache.add_received(10).await;
        cache
            .restore(vec![event("t", "e1", "2025-01-01T00:00:00Z", None)], 7)
            .await;

        let c = cache.counters().await;
        assert_eq!(c.unique_processed, 7);
        assert_eq!(c.duplicate_dropped, 0);
        // restore never touches received
        assert_eq!(c.received, 10);
    }

    #[tokio::test]
    async fn persist_failure_counts_under_both() {
        let cache = ProjectionCache::new();
        cache.record_duplicate().await;
        cache.record_persist_failure().await;

        let c = cache.counters().await;
        assert_eq!(c.duplicate_dropped, 2);
        assert_eq!(c.persist_failed, 1);
    }

    #[tokio::test]
    async fn sort_falls_back_to_timestamp_and_is_stable() {
        let cache = ProjectionCache::new();
        cache
            .record_accepted(event("t", "b", "2025-01-01T00:00:02Z", None))
            .await;
        cache
            .record_accepted(event(
                "t",
                "a",
                "2025-01-01T00:00:09Z",
                Some("2025-01-01T00:00:01Z"),
            ))
            .await;
        // Two equal keys keep insertion order.
        cache
            .record_accepted(event("t", "c", "2025-01-01T00:00:02Z", None))
            .await;

        let ids: Vec<String> = cache
            .events_sorted(None)
            .await
            .into_iter()
            .map(|e| e.event_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn topic_filter_matches_exactly() {
        let cache = ProjectionCache::new();
        cache
            .record_accepted(event("orders", "o1", "2025-01-01T00:00:01Z", None))
            .await;
        cache
            .record_accepted(event("users", "u1", "2025-01-01T00:00:02Z", None))
            .await;

        let filtered = cache.events_sorted(Some("orders")).await;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].event_id, "o1");
    }

    #[tokio::test]
    async fn snapshot_derives_distinct_topics() {
        let cache = ProjectionCache::new();
        cache
            .record_accepted(event("orders", "o1", "2025-01-01T00:00:01Z", None))
            .await;
        cache
            .record_accepted(event("orders", "o2", "2025-01-01T00:00:02Z", None))
            .await;
        cache
            .record_accepted(event("users", "u1", "2025-01-01T00:00:03Z", None))
            .await;

        let mut topics = cache.snapshot(0.0).await.topics;
        topics.sort();
        assert_eq!(topics, vec!["orders", "users"]);
    }
}
