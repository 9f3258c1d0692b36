//! Workload generator: replays a realistic at-least-once stream against a
//! running aggregator, deliberate duplicates included.

use std::time::Duration;

use anyhow::{bail, Result};
use chrono::{SecondsFormat, Utc};
use clap::Parser;
use rand::seq::{IndexedRandom, SliceRandom};
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use logsift_common::Event;

const TOPICS: &[&str] = &["user.created", "order.placed", "payment.processed"];

#[derive(Parser)]
#[command(name = "logsift-publisher", about = "Synthetic event publisher for a logsift node")]
struct Cli {
    /// Base URL of the aggregator
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    url: String,

    /// Total number of publish requests to send
    #[arg(long, default_value_t = 5000)]
    total: usize,

    /// Fraction of the stream that retransmits an earlier event
    #[arg(long, default_value_t = 0.2)]
    duplicate_ratio: f64,

    /// Delay between publishes, in milliseconds
    #[arg(long, default_value_t = 1)]
    delay_ms: u64,

    /// Run identifier namespacing event_ids (random per invocation)
    #[arg(long)]
    run_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    if !(0.0..1.0).contains(&cli.duplicate_ratio) {
        bail!("--duplicate-ratio must be in [0, 1)");
    }
    let run_id = cli
        .run_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let client = reqwest::Client::new();
    wait_for_aggregator(&client, &cli.url).await?;

    let events = build_workload(cli.total, cli.duplicate_ratio, &run_id);
    info!(
        total = events.len(),
        run_id = run_id.as_str(),
        "publishing workload"
    );

    for event in &events {
        client
            .post(format!("{}/publish", cli.url))
            .json(event)
            .send()
            .await?
            .error_for_status()?;
        tokio::time::sleep(Duration::from_millis(cli.delay_ms)).await;
    }

    let stats: serde_json::Value = client
        .get(format!("{}/stats", cli.url))
        .send()
        .await?
        .json()
        .await?;
    info!(stats = %stats, "publish run complete");

    Ok(())
}

/// Poll `/health` until the node answers, with a bounded number of retries.
async fn wait_for_aggregator(client: &reqwest::Client, base_url: &str) -> Result<()> {
    for _ in 0..30 {
        match client.get(format!("{base_url}/health")).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("aggregator is ready");
                return Ok(());
            }
            _ => {
                info!("waiting for aggregator...");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }
    }
    bail!("aggregator at {base_url} not available after waiting")
}

/// Build `total` events of which roughly `duplicate_ratio` retransmit an
/// earlier identity key with a fresh timestamp, then shuffle the stream so
/// duplicates interleave with originals.
fn build_workload(total: usize, duplicate_ratio: f64, run_id: &str) -> Vec<Event> {
    let mut rng = rand::rng();

    let duplicate_count = (total as f64 * duplicate_ratio) as usize;
    let unique_count = total - duplicate_count;

    let mut events: Vec<Event> = (0..unique_count)
        .map(|i| {
            let mut payload = serde_json::Map::new();
            payload.insert("data".to_string(), json!(format!("event-{i}")));
            Event {
                topic: TOPICS.choose(&mut rng).unwrap().to_string(),
                event_id: format!("evt-{run_id}-{i}"),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
                source: "publisher-service".to_string(),
                payload,
                received_at: None,
            }
        })
        .collect();

    let duplicates: Vec<Event> = events
        .choose_multiple(&mut rng, duplicate_count)
        .map(|original| {
            let mut replay = original.clone();
            replay.timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
            replay
        })
        .collect();

    events.extend(duplicates);
    events.shuffle(&mut rng);
    events
}
