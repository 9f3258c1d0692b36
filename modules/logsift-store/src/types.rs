use anyhow::Result;
use logsift_common::Event;
use serde_json::{Map, Value};

/// Row counts used to reconcile in-memory counters at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCounts {
    /// Rows in the accepted-event log.
    pub unique_processed: i64,
    /// Rows in the identity-key set.
    pub total_processed: i64,
}

/// A row from the events table. Payload is stored as an opaque JSON string.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct EventRow {
    pub topic: String,
    pub event_id: String,
    pub timestamp: String,
    pub source: String,
    pub payload: String,
    pub received_at: Option<String>,
}

impl EventRow {
    pub(crate) fn into_event(self) -> Result<Event> {
        let payload: Map<String, Value> = serde_json::from_str(&self.payload)?;
        Ok(Event {
            topic: self.topic,
            event_id: self.event_id,
            timestamp: self.timestamp,
            source: self.source,
            payload,
            received_at: self.received_at,
        })
    }
}
