//! seq-server — API binary
//!
//! Startup order: config → backends (audit store, counter store,
//! broker) → counter reconciliation → HTTP serve, with the optional
//! embedded audit consumer as a background task. Shutdown drains
//! in-flight work within a deadline before the clients drop.

use seq_server::api;
use seq_server::config::Config;
use seq_server::consumer::AuditConsumer;
use seq_server::reconcile::Reconciler;
use seq_server::state::AppState;
use seq_server::tasks::BackgroundTasks;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seq_server=info".into()),
        )
        .init();

    let config = Config::from_env();

    tracing::info!("Starting seq-server (env: {})", config.environment);

    let state = AppState::new(&config).await?;

    // The audit store is authoritative; bring counters up to it before
    // accepting traffic.
    Reconciler::new(state.counter.clone(), state.store.clone())
        .sync_all()
        .await?;

    let mut tasks = BackgroundTasks::new();
    if config.enable_embedded_consumer {
        let consumer = AuditConsumer::new(
            state.store.clone(),
            state.queue.clone(),
            config.consumer_workers,
        );
        let token = tasks.shutdown_token();
        tasks.spawn("audit_consumer", async move {
            consumer.run(token).await;
        });
    }

    let addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("seq-server HTTP listening on {addr}");

    let app = api::create_router(state);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tasks.shutdown(config.shutdown_timeout()).await;
    tracing::info!("seq-server stopped");
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
        () = ctrl_c => tracing::info!("Received Ctrl+C, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
