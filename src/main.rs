use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use order_pipeline::http::AppState;
use order_pipeline::store::OrderStore;
use order_pipeline::{Config, Ingestor, Metrics, OrderCache, OrderConsumer, OrderError, PgStore};

/// Bound on how long shutdown waits for the consume loop to exit.
const SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging with environment-based filtering.
    // Override with RUST_LOG, e.g. RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,order_pipeline=debug")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!("configuration loaded");

    // === 1. Authoritative store (connects and bootstraps the schema) ===
    let store: Arc<dyn OrderStore> = Arc::new(PgStore::new(&config.database_url).await?);
    tracing::info!("order store initialized");

    // === 2. Metrics ===
    let metrics = Arc::new(Metrics::new()?);

    // === 3. Cache, warmed from the store; a warm failure aborts startup ===
    let cache = Arc::new(OrderCache::new(store.clone(), metrics.clone()).await?);
    tracing::info!(orders = cache.len().await, "order cache initialized");

    // === 4. Kafka consumer feeding the ingestion orchestrator ===
    let consumer = OrderConsumer::new(
        &config.kafka_brokers,
        &config.kafka_topic,
        &config.kafka_group_id,
        metrics.clone(),
    )?;
    let ingestor = Arc::new(Ingestor::new(store, cache.clone(), metrics.clone()));

    let shutdown = CancellationToken::new();
    let consumer_task = tokio::spawn({
        let shutdown = shutdown.clone();
        let ingestor = ingestor.clone();
        async move {
            let result = consumer
                .run(shutdown, |order| {
                    let ingestor = ingestor.clone();
                    async move { ingestor.ingest(order).await }
                })
                .await;
            if let Err(e) = &result {
                if *e != OrderError::Cancelled {
                    tracing::error!(error = %e, "consumer stopped with error");
                }
            }
        }
    });

    // === 5. HTTP read path ===
    let server = order_pipeline::http::serve(&config.http_addr, AppState { cache, metrics })?;
    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    // === 6. Wait for a shutdown signal ===
    wait_for_signal().await;
    tracing::info!("received shutdown signal, starting graceful shutdown");

    shutdown.cancel();
    server_handle.stop(true).await;

    if tokio::time::timeout(SHUTDOWN_DEADLINE, consumer_task)
        .await
        .is_err()
    {
        tracing::warn!("consumer did not stop within the shutdown deadline");
    }
    if let Ok(Err(e)) = server_task.await {
        tracing::error!(error = %e, "HTTP server error");
    }

    tracing::info!("shutdown complete");
    Ok(())
}

async fn wait_for_signal() {
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = sigterm.recv() => {}
    }
}
