//! seq-worker — standalone audit consumer
//!
//! Runs the same consumer pool as the embedded one, out of process:
//! reads audit events from the broker and materializes them as audit
//! rows. Horizontally scalable; instances share load through the
//! broker's competing-consumers pattern.

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use seq_server::config::Config;
use seq_server::consumer::AuditConsumer;
use seq_server::db::PgAuditStore;
use seq_server::queue::{AmqpQueue, AmqpSettings};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seq_worker=info,seq_server=info".into()),
        )
        .init();

    let config = Config::from_env();

    tracing::info!("Starting seq-worker (env: {})", config.environment);

    // Migrations are owned by the API server; the worker only connects.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .min_connections(config.database_min_connections)
        .max_lifetime(Duration::from_secs(3600))
        .connect(&config.database_url)
        .await?;
    let store = Arc::new(PgAuditStore::new(pool));

    let queue = Arc::new(
        AmqpQueue::connect(&AmqpSettings {
            url: config.amqp_url.clone(),
            exchange: config.amqp_exchange.clone(),
            queue: config.amqp_queue.clone(),
            prefetch: config.consumer_prefetch,
        })
        .await?,
    );

    let consumer = AuditConsumer::new(store, queue, config.consumer_workers);
    let cancel = CancellationToken::new();

    let pool_handle = {
        let cancel = cancel.clone();
        tokio::spawn(async move { consumer.run(cancel).await })
    };

    shutdown_signal().await;
    tracing::info!("Shutting down worker gracefully...");
    cancel.cancel();

    if tokio::time::timeout(config.shutdown_timeout(), pool_handle)
        .await
        .is_err()
    {
        tracing::error!("Consumer did not drain within deadline");
    }

    tracing::info!("seq-worker stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }
}
