//! The aggregator node: HTTP boundary, intake queue, sequential processor,
//! and the in-memory stats/projection cache.
//!
//! One long-lived processor task is the sole consumer of the queue and the
//! sole steady-state writer of durable and in-memory accepted-state. That
//! single-writer property is what makes the two-step dedup check safe; it is
//! a correctness precondition, not an incidental detail.

pub mod cache;
pub mod consumer;
pub mod context;
pub mod queue;
pub mod routes;

pub use cache::ProjectionCache;
pub use context::AppContext;
pub use queue::{IntakeQueue, IntakeReceiver};
