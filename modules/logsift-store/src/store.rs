//! DedupStore — SQLite-backed identity set and accepted-event log.
//!
//! Two tables, updated in lock-step by the single processor:
//! `dedup_keys` answers "have we seen this key", `events` holds the full
//! accepted record. Mutations serialize through one writer lock; lookups
//! skip it, trading a slim staleness window for read concurrency. That is
//! safe because exactly one processor ever mutates state, and
//! `INSERT OR IGNORE` on the identity table is the backstop either way.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::info;

use logsift_common::Event;

use crate::types::{EventRow, StoreCounts};

#[derive(Clone)]
pub struct DedupStore {
    pool: SqlitePool,
    write_lock: Arc<Mutex<()>>,
}

impl DedupStore {
    /// Open (creating if missing) the database file at `path`.
    pub async fn connect(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await
            .with_context(|| format!("opening sqlite database {}", path.display()))?;

        Ok(Self::new(pool))
    }

    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create both tables if absent. Idempotent; safe to call mid-run.
    pub async fn initialize(&self) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dedup_keys (
                topic     TEXT NOT NULL,
                event_id  TEXT NOT NULL,
                timestamp TEXT,
                PRIMARY KEY (topic, event_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                topic       TEXT NOT NULL,
                event_id    TEXT NOT NULL,
                timestamp   TEXT,
                source      TEXT,
                payload     TEXT,
                received_at TEXT,
                PRIMARY KEY (topic, event_id)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        info!("DedupStore initialized");
        Ok(())
    }

    /// Point lookup against the identity-key set. No side effects, no lock.
    pub async fn is_duplicate(&self, topic: &str, event_id: &str) -> Result<bool> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT 1 FROM dedup_keys WHERE topic = ? AND event_id = ?",
        )
        .bind(topic)
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.is_some())
    }

    /// Insert the identity key. A no-op when it already exists, which absorbs
    /// both the check-then-mark race window and duplicate replays after a
    /// crash/restart.
    pub async fn mark_processed(
        &self,
        topic: &str,
        event_id: &str,
        timestamp: &str,
    ) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        sqlx::query(
            "INSERT OR IGNORE INTO dedup_keys (topic, event_id, timestamp) VALUES (?, ?, ?)",
        )
        .bind(topic)
        .bind(event_id)
        .bind(timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or replace the accepted-event record for the event's identity
    /// key. The payload is serialized opaquely; the store never interprets it.
    pub async fn save_event(&self, event: &Event) -> Result<()> {
        let payload = serde_json::to_string(&event.payload)?;

        let _guard = self.write_lock.lock().await;

        sqlx::query(
            r#"
            INSERT OR REPLACE INTO events (topic, event_id, timestamp, source, payload, received_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.topic)
        .bind(&event.event_id)
        .bind(&event.timestamp)
        .bind(&event.source)
        .bind(&payload)
        .bind(&event.received_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Every accepted event, ordered by `received_at` ascending. Called once
    /// at startup to rebuild the in-memory mirror.
    pub async fn load_events(&self) -> Result<Vec<Event>> {
        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT topic, event_id, timestamp, source, payload, received_at
            FROM events
            ORDER BY received_at
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EventRow::into_event).collect()
    }

    /// Row counts of the two tables, for startup counter reconciliation.
    pub async fn get_stats(&self) -> Result<StoreCounts> {
        let (unique_processed,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM events")
            .fetch_one(&self.pool)
            .await?;

        let (total_processed,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM dedup_keys")
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreCounts {
            unique_processed,
            total_processed,
        })
    }
}
