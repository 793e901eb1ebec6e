//! Application state wiring
//!
//! Initializes the three long-lived clients (counter store, audit
//! store, broker) and assembles the issuance service over them. All
//! other state is request-scoped.

use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::counter::{CounterStore, RedisCounterStore};
use crate::db::{AuditStore, PgAuditStore};
use crate::queue::{AmqpQueue, AmqpSettings, AuditQueue};
use crate::service::SequenceService;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub service: Arc<SequenceService>,
    pub counter: Arc<dyn CounterStore>,
    pub store: Arc<dyn AuditStore>,
    pub queue: Arc<dyn AuditQueue>,
}

impl AppState {
    /// Connect all backends and build the service. Connection order is
    /// audit store, counter store, broker; shutdown drops them in
    /// reverse.
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .max_lifetime(Duration::from_secs(3600))
            .connect(&config.database_url)
            .await?;

        // Run migrations
        sqlx::migrate!("./migrations").run(&pool).await?;

        let store: Arc<dyn AuditStore> = Arc::new(PgAuditStore::new(pool));
        let counter: Arc<dyn CounterStore> =
            Arc::new(RedisCounterStore::connect(&config.redis_url).await?);
        let queue: Arc<dyn AuditQueue> = Arc::new(
            AmqpQueue::connect(&AmqpSettings {
                url: config.amqp_url.clone(),
                exchange: config.amqp_exchange.clone(),
                queue: config.amqp_queue.clone(),
                prefetch: config.consumer_prefetch,
            })
            .await?,
        );

        Ok(Self::with_backends(config.clone(), counter, store, queue))
    }

    /// Assemble over explicit backends (tests, embedded runs).
    pub fn with_backends(
        config: Config,
        counter: Arc<dyn CounterStore>,
        store: Arc<dyn AuditStore>,
        queue: Arc<dyn AuditQueue>,
    ) -> Self {
        let service = Arc::new(SequenceService::new(
            counter.clone(),
            store.clone(),
            queue.clone(),
            config.service_timeouts(),
            config.config_cache_ttl(),
        ));
        Self {
            config,
            service,
            counter,
            store,
            queue,
        }
    }
}
