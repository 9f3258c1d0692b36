use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use logsift_common::Config;
use logsift_server::{routes, AppContext};
use logsift_store::DedupStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("logsift=info".parse()?))
        .init();

    let config = Config::from_env();

    let store = DedupStore::connect(&config.db_path).await?;
    let (ctx, worker) = AppContext::start(store).await?;

    let app = routes::router(ctx.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("logsift aggregator listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received, draining intake queue");
        })
        .await?;

    // Boundary has stopped accepting; drain what is already queued, then
    // stop the processor.
    ctx.shutdown(worker).await;
    Ok(())
}
