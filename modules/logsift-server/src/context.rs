//! Application context: the one explicitly-constructed object holding the
//! queue, store handle, and cache. Built at startup, passed by reference to
//! every collaborator. No module-level globals.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tokio::task::JoinHandle;
use tracing::info;

use logsift_store::DedupStore;

use crate::cache::ProjectionCache;
use crate::consumer;
use crate::queue::IntakeQueue;

pub struct AppContext {
    pub store: DedupStore,
    pub queue: IntakeQueue,
    pub cache: ProjectionCache,
    started_at: Instant,
}

impl AppContext {
    /// Initialize the store, rebuild the projection cache from durable
    /// state, and spawn the processor task. Returns the context and the
    /// processor handle so shutdown can stop it after the queue drains.
    pub async fn start(store: DedupStore) -> Result<(Arc<Self>, JoinHandle<()>)> {
        store.initialize().await?;

        let events = store.load_events().await?;
        let counts = store.get_stats().await?;
        info!(loaded = events.len(), "rebuilt projection from store");

        let cache = ProjectionCache::new();
        cache
            .restore(events, counts.unique_processed.max(0) as u64)
            .await;

        let (queue, rx) = IntakeQueue::new();

        let ctx = Arc::new(Self {
            store,
            queue,
            cache,
            started_at: Instant::now(),
        });

        let worker = tokio::spawn(consumer::run(ctx.clone(), rx));

        Ok((ctx, worker))
    }

    pub fn uptime(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }

    /// Clean shutdown: wait for every enqueued event to be processed, then
    /// stop the processor task. The boundary must already have stopped
    /// accepting new events.
    pub async fn shutdown(&self, worker: JoinHandle<()>) {
        self.queue.drained().await;
        worker.abort();
        let _ = worker.await;
        info!("intake queue drained, processor stopped");
    }
}
