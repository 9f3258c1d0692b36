//! Wire types shared by the aggregator node and the publisher.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LogsiftError;

/// A single published event. `received_at` is absent until the processor
/// accepts the event and stamps it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub topic: String,
    pub event_id: String,
    pub timestamp: String,
    pub source: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
    #[serde(default)]
    pub received_at: Option<String>,
}

impl Event {
    /// Boundary validation: non-empty identity fields and a parseable
    /// ISO-8601 timestamp. Runs before the event can enter the pipeline.
    pub fn validate(&self) -> Result<(), LogsiftError> {
        if self.topic.is_empty() {
            return Err(LogsiftError::Validation("topic must not be empty".into()));
        }
        if self.event_id.is_empty() {
            return Err(LogsiftError::Validation(
                "event_id must not be empty".into(),
            ));
        }
        if self.source.is_empty() {
            return Err(LogsiftError::Validation("source must not be empty".into()));
        }
        if !is_valid_timestamp(&self.timestamp) {
            return Err(LogsiftError::Validation(format!(
                "Invalid timestamp format for event {}",
                self.event_id
            )));
        }
        Ok(())
    }

    /// Sort key for the accepted-event log: acceptance time when stamped,
    /// producer timestamp otherwise.
    pub fn sort_key(&self) -> &str {
        self.received_at.as_deref().unwrap_or(&self.timestamp)
    }
}

/// Batch submission shape: `{"events": [...]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventBatch {
    pub events: Vec<Event>,
}

/// A publish body is either one event or a batch of them.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PublishBody {
    Batch(EventBatch),
    Single(Event),
}

impl PublishBody {
    pub fn into_events(self) -> Vec<Event> {
        match self {
            PublishBody::Single(event) => vec![event],
            PublishBody::Batch(batch) => batch.events,
        }
    }
}

/// The `/stats` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub received: u64,
    pub unique_processed: u64,
    pub duplicate_dropped: u64,
    pub topics: Vec<String>,
    pub uptime: f64,
}

/// Accepts RFC 3339 date-times (with an offset or a trailing `Z`) and
/// offset-naive ISO-8601 date-times.
pub fn is_valid_timestamp(value: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(value).is_ok()
        || value.parse::<chrono::NaiveDateTime>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(topic: &str, event_id: &str, timestamp: &str) -> Event {
        Event {
            topic: topic.to_string(),
            event_id: event_id.to_string(),
            timestamp: timestamp.to_string(),
            source: "test-source".to_string(),
            payload: Map::new(),
            received_at: None,
        }
    }

    #[test]
    fn timestamp_accepts_utc_suffix_and_offset() {
        assert!(is_valid_timestamp("2025-10-21T14:30:00Z"));
        assert!(is_valid_timestamp("2025-10-21T14:30:00+07:00"));
        assert!(is_valid_timestamp("2025-10-21T14:30:00.123456Z"));
        assert!(is_valid_timestamp("2025-10-21T14:30:00"));
    }

    #[test]
    fn timestamp_rejects_garbage() {
        assert!(!is_valid_timestamp("not-a-date"));
        assert!(!is_valid_timestamp(""));
        assert!(!is_valid_timestamp("2025-13-45T99:00:00Z"));
    }

    #[test]
    fn validate_rejects_empty_identity_fields() {
        assert!(event("", "e1", "2025-01-01T00:00:00Z").validate().is_err());
        assert!(event("t", "", "2025-01-01T00:00:00Z").validate().is_err());
        let mut e = event("t", "e1", "2025-01-01T00:00:00Z");
        e.source = String::new();
        assert!(e.validate().is_err());
        assert!(event("t", "e1", "2025-01-01T00:00:00Z").validate().is_ok());
    }

    #[test]
    fn publish_body_parses_single_event() {
        let body: PublishBody = serde_json::from_value(json!({
            "topic": "user.created",
            "event_id": "evt-1",
            "timestamp": "2025-10-21T14:30:00Z",
            "source": "auth-service",
            "payload": {"user_id": 123}
        }))
        .unwrap();
        let events = body.into_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_id, "evt-1");
    }

    #[test]
    fn publish_body_parses_batch() {
        let body: PublishBody = serde_json::from_value(json!({
            "events": [
                {"topic": "a", "event_id": "1", "timestamp": "2025-01-01T00:00:00Z", "source": "s"},
                {"topic": "b", "event_id": "2", "timestamp": "2025-01-01T00:00:00Z", "source": "s"}
            ]
        }))
        .unwrap();
        assert_eq!(body.into_events().len(), 2);
    }

    #[test]
    fn payload_defaults_to_empty_map() {
        let e: Event = serde_json::from_value(json!({
            "topic": "t",
            "event_id": "e1",
            "timestamp": "2025-01-01T00:00:00Z",
            "source": "s"
        }))
        .unwrap();
        assert!(e.payload.is_empty());
        assert!(e.received_at.is_none());
    }

    #[test]
    fn sort_key_prefers_received_at() {
        let mut e = event("t", "e1", "2025-01-01T00:00:00Z");
        assert_eq!(e.sort_key(), "2025-01-01T00:00:00Z");
        e.received_at = Some("2025-06-01T00:00:00Z".to_string());
        assert_eq!(e.sort_key(), "2025-06-01T00:00:00Z");
    }
}
