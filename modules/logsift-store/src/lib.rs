//! Durable identity store for the ingestion pipeline.
//!
//! Records which `(topic, event_id)` keys have been seen and keeps the full
//! accepted-event log, both surviving process restart. The composite primary
//! key on the identity table is the authoritative dedup decision; everything
//! in memory is a rebuildable projection of what lives here.

pub mod store;
pub mod types;

pub use store::DedupStore;
pub use types::StoreCounts;
