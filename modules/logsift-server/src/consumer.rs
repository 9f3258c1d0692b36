//! The sequential processor: sole consumer of the intake queue, sole
//! steady-state writer to the store and the cache.
//!
//! Per event: dedup check, then mark + stamp + save, then count. A failure
//! in any step drops that event and counts it; it never blocks or corrupts
//! processing of subsequent events, and the loop never silently exits.

use std::sync::Arc;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use tracing::{error, info, warn};

use logsift_common::Event;

use crate::context::AppContext;
use crate::queue::IntakeReceiver;

/// Drain the queue until the sender side shuts down. Each dequeued event is
/// marked complete on every exit path so drain/shutdown can observe progress.
pub async fn run(ctx: Arc<AppContext>, mut rx: IntakeReceiver) {
    info!("consumer worker started");
    while let Some(event) = rx.recv().await {
        process_one(&ctx, event).await;
        rx.mark_done();
    }
    info!("consumer worker stopped");
}

async fn process_one(ctx: &AppContext, event: Event) {
    let is_dup = match ctx.store.is_duplicate(&event.topic, &event.event_id).await {
        Ok(is_dup) => is_dup,
        Err(err) => {
            // Lookup failure is a processing failure: drop and count, same
            // as a failed persist. The loop keeps going.
            error!(
                topic = event.topic.as_str(),
                event_id = event.event_id.as_str(),
                error = %err,
                "dedup lookup failed, event dropped"
            );
            ctx.cache.record_persist_failure().await;
            return;
        }
    };

    if is_dup {
        ctx.cache.record_duplicate().await;
        warn!(
            topic = event.topic.as_str(),
            event_id = event.event_id.as_str(),
            source = event.source.as_str(),
            "duplicate detected"
        );
        return;
    }

    match persist(ctx, event).await {
        Ok(event) => {
            info!(
                topic = event.topic.as_str(),
                event_id = event.event_id.as_str(),
                source = event.source.as_str(),
                "processed"
            );
            ctx.cache.record_accepted(event).await;
        }
        Err((event, err)) => {
            error!(
                topic = event.topic.as_str(),
                event_id = event.event_id.as_str(),
                error = %err,
                "error processing event"
            );
            ctx.cache.record_persist_failure().await;
        }
    }
}

/// Mark the identity key, stamp `received_at`, save the record. Returns the
/// stamped event on success, or the event back with the error so the caller
/// can still log its identity. No automatic retry.
async fn persist(ctx: &AppContext, mut event: Event) -> Result<Event, (Event, anyhow::Error)> {
    if let Err(err) = ctx
        .store
        .mark_processed(&event.topic, &event.event_id, &event.timestamp)
        .await
    {
        return Err((event, err));
    }

    event.received_at = Some(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true));

    if let Err(err) = ctx.store.save_event(&event).await {
        return Err((event, err));
    }

    Ok(event)
}
