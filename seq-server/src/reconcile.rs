//! Startup reconciliation
//!
//! The audit store is the authority on what has already been issued.
//! On process start (and on demand from recovery tooling) every
//! configured prefix has its fast counter raised to the audit store's
//! maximum when it is behind. The counter is never lowered here: a
//! counter ahead of the audit store only means gaps, which are allowed;
//! a counter behind it would reissue values, which is not.
//!
//! Must not run concurrently with itself for the same prefix; startup
//! usage is naturally single-threaded.

use shared::error::{AppError, AppResult};
use std::sync::Arc;

use crate::counter::CounterStore;
use crate::db::AuditStore;

pub struct Reconciler {
    counter: Arc<dyn CounterStore>,
    store: Arc<dyn AuditStore>,
}

impl Reconciler {
    pub fn new(counter: Arc<dyn CounterStore>, store: Arc<dyn AuditStore>) -> Self {
        Self { counter, store }
    }

    /// Reconcile every configured prefix. Per-prefix failures are
    /// logged and skipped so one bad prefix cannot block startup.
    pub async fn sync_all(&self) -> AppResult<()> {
        tracing::info!("Starting counter reconciliation");
        let configs = self.store.list_configs().await?;

        for config in &configs {
            if let Err(e) = self.sync_prefix(&config.prefix).await {
                tracing::error!(error = %e, prefix = %config.prefix, "Failed to reconcile prefix");
            }
        }

        tracing::info!(prefixes = configs.len(), "Counter reconciliation completed");
        Ok(())
    }

    /// Reconcile one prefix; returns the audit store's maximum counter.
    pub async fn sync_prefix(&self, prefix: &str) -> Result<i64, AppError> {
        let max_counter = self.store.max_counter(prefix).await?;
        let current = self.counter.read(prefix).await?;

        if max_counter > current {
            self.counter.set(prefix, max_counter).await?;
            tracing::info!(
                prefix,
                synced_counter = max_counter,
                stale_counter = current,
                "Raised counter to audit store maximum"
            );
        }

        if let Err(e) = self
            .store
            .upsert_checkpoint(prefix, max_counter, "system")
            .await
        {
            tracing::error!(error = %e, prefix, "Failed to update checkpoint");
        }

        Ok(max_counter)
    }
}
