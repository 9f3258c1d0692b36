//! Intake queue: unbounded, ordered hand-off from the boundary layer to the
//! processor. Enqueue never blocks the caller; the consumer blocks on recv.
//!
//! An in-flight counter (enqueued minus completed) backs `drained()`, which
//! shutdown and tests use to wait for the queue to settle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Notify};
use tracing::warn;

use logsift_common::Event;

pub struct IntakeQueue {
    tx: mpsc::UnboundedSender<Event>,
    in_flight: Arc<AtomicU64>,
    settled: Arc<Notify>,
}

pub struct IntakeReceiver {
    rx: mpsc::UnboundedReceiver<Event>,
    in_flight: Arc<AtomicU64>,
    settled: Arc<Notify>,
}

impl IntakeQueue {
    pub fn new() -> (Self, IntakeReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let in_flight = Arc::new(AtomicU64::new(0));
        let settled = Arc::new(Notify::new());
        (
            Self {
                tx,
                in_flight: in_flight.clone(),
                settled: settled.clone(),
            },
            IntakeReceiver {
                rx,
                in_flight,
                settled,
            },
        )
    }

    /// Hand an event to the processor. Never blocks. A send can only fail
    /// once the consumer is gone, i.e. during shutdown after the boundary
    /// should have stopped accepting.
    pub fn enqueue(&self, event: Event) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        if let Err(rejected) = self.tx.send(event) {
            self.complete_one();
            warn!(
                topic = rejected.0.topic.as_str(),
                event_id = rejected.0.event_id.as_str(),
                "intake queue closed, event dropped"
            );
        }
    }

    /// Resolves once every enqueued event has been marked complete.
    pub async fn drained(&self) {
        loop {
            let notified = self.settled.notified();
            if self.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    pub fn depth(&self) -> u64 {
        self.in_flight.load(Ordering::Acquire)
    }

    fn complete_one(&self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.settled.notify_waiters();
        }
    }
}

impl IntakeReceiver {
    /// Next event in FIFO order; `None` once the sender side is gone and the
    /// channel is drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Mark the most recently dequeued event complete, whatever its outcome.
    /// Every exit path of the processor must reach this.
    pub fn mark_done(&self) {
        if self.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.settled.notify_waiters();
        }
    }
}
