//! Issuance service
//!
//! `SequenceService` is the critical path exposed to transport
//! adapters: config lookup, atomic counter advance, formatting, audit
//! publish, reply. It owns the three store seams, the prefix config
//! cache and the per-call deadlines.
//!
//! Two ordering rules shape the code here:
//! - the counter is never rolled back once advanced (unsound under
//!   concurrent callers), so a failed audit publish is logged and
//!   counted, and the id is still returned;
//! - once `advance` has succeeded the remaining work runs in a spawned
//!   task, so a caller that goes away cannot leave an advanced value
//!   with no trace.

mod cache;

pub use cache::{CachedConfig, ConfigCache};

use chrono::Utc;
use shared::error::{AppError, AppResult};
use shared::models::{
    AuditEvent, AuditRow, BatchRequest, BatchResponse, ConfigUpdateRequest, CounterStatus,
    HealthStatus, IssuedId, PrefixConfig, ResetRequest, ResetResponse,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use uuid::Uuid;

use crate::counter::CounterStore;
use crate::db::{AuditStore, ConfigPatch, NewResetLog};
use crate::error::timeout_error;
use crate::format::IdTemplate;
use crate::queue::AuditQueue;

/// Per-call deadlines for the external stores
#[derive(Debug, Clone)]
pub struct ServiceTimeouts {
    pub advance: Duration,
    pub publish: Duration,
    pub config_read: Duration,
}

impl Default for ServiceTimeouts {
    fn default() -> Self {
        Self {
            advance: Duration::from_millis(100),
            publish: Duration::from_millis(500),
            config_read: Duration::from_millis(200),
        }
    }
}

/// The issuance core
pub struct SequenceService {
    counter: Arc<dyn CounterStore>,
    store: Arc<dyn AuditStore>,
    queue: Arc<dyn AuditQueue>,
    timeouts: ServiceTimeouts,
    cache: ConfigCache,
    audit_lost: Arc<AtomicU64>,
}

impl SequenceService {
    pub fn new(
        counter: Arc<dyn CounterStore>,
        store: Arc<dyn AuditStore>,
        queue: Arc<dyn AuditQueue>,
        timeouts: ServiceTimeouts,
        config_cache_ttl: Duration,
    ) -> Self {
        Self {
            counter,
            store,
            queue,
            timeouts,
            cache: ConfigCache::new(config_cache_ttl),
            audit_lost: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Issuances whose audit publish failed since process start
    pub fn audit_events_lost(&self) -> u64 {
        self.audit_lost.load(Ordering::Relaxed)
    }

    /// Generate the next identifier for a prefix.
    pub async fn issue(
        &self,
        prefix: &str,
        client_id: &str,
        generated_by: &str,
        correlation_id: Option<String>,
    ) -> AppResult<IssuedId> {
        let entry = self.prefix_config(prefix).await?;

        let counter = timeout(self.timeouts.advance, self.counter.advance(prefix))
            .await
            .map_err(|_| timeout_error("counter advance"))??;

        // The counter has moved; finish regardless of the caller.
        let queue = self.queue.clone();
        let audit_lost = self.audit_lost.clone();
        let publish_timeout = self.timeouts.publish;
        let prefix = prefix.to_string();
        let client_id = client_id.to_string();
        let generated_by = generated_by.to_string();
        let handle = tokio::spawn(async move {
            let generated_at = Utc::now();
            let message_id = Uuid::new_v4();
            let full_number = entry.template.render(&entry.config, counter, generated_at);

            let issued = IssuedId {
                prefix: prefix.clone(),
                counter,
                full_number: full_number.clone(),
                message_id,
                generated_at,
                client_id: client_id.clone(),
                generated_by: generated_by.clone(),
            };
            let event = AuditEvent {
                message_id,
                prefix,
                counter,
                full_number,
                generated_by,
                client_id,
                correlation_id,
                generated_at,
                published_at: Utc::now(),
                retry_count: 0,
                batch_id: None,
            };
            publish_with_accounting(queue.as_ref(), publish_timeout, &audit_lost, &event).await;
            issued
        });

        let issued = handle
            .await
            .map_err(|e| AppError::internal(format!("issuance task failed: {e}")))?;

        tracing::info!(
            prefix = %issued.prefix,
            counter = issued.counter,
            full_number = %issued.full_number,
            client_id = %issued.client_id,
            generated_by = %issued.generated_by,
            "Issued sequential id"
        );
        Ok(issued)
    }

    /// Generate a contiguous batch with a single counter advance.
    pub async fn issue_batch(&self, prefix: &str, req: BatchRequest) -> AppResult<BatchResponse> {
        let entry = self.prefix_config(prefix).await?;

        let end = timeout(
            self.timeouts.advance,
            self.counter.advance_by(prefix, req.count),
        )
        .await
        .map_err(|_| timeout_error("counter advance"))??;

        let count = req.count;
        let start = end - count as i64 + 1;

        let queue = self.queue.clone();
        let audit_lost = self.audit_lost.clone();
        let publish_timeout = self.timeouts.publish;
        let prefix_owned = prefix.to_string();
        let handle = tokio::spawn(async move {
            let generated_at = Utc::now();
            let batch_id = Uuid::new_v4().to_string();

            let mut ids = Vec::with_capacity(count as usize);
            for counter in start..=end {
                let message_id = Uuid::new_v4();
                let full_number = entry.template.render(&entry.config, counter, generated_at);
                ids.push(IssuedId {
                    prefix: prefix_owned.clone(),
                    counter,
                    full_number: full_number.clone(),
                    message_id,
                    generated_at,
                    client_id: req.client_id.clone(),
                    generated_by: req.generated_by.clone(),
                });

                let event = AuditEvent {
                    message_id,
                    prefix: prefix_owned.clone(),
                    counter,
                    full_number,
                    generated_by: req.generated_by.clone(),
                    client_id: req.client_id.clone(),
                    correlation_id: req.correlation_id.clone(),
                    generated_at,
                    published_at: Utc::now(),
                    retry_count: 0,
                    batch_id: Some(batch_id.clone()),
                };
                publish_with_accounting(queue.as_ref(), publish_timeout, &audit_lost, &event)
                    .await;
            }

            BatchResponse {
                ids,
                batch_id,
                count,
                generated_at,
            }
        });

        let response = handle
            .await
            .map_err(|e| AppError::internal(format!("issuance task failed: {e}")))?;

        tracing::info!(
            prefix,
            count,
            batch_id = %response.batch_id,
            start,
            end,
            "Issued batch of sequential ids"
        );
        Ok(response)
    }

    /// Current counter value plus backing store health.
    pub async fn status(&self, prefix: &str) -> AppResult<CounterStatus> {
        let current = timeout(self.timeouts.advance, self.counter.read(prefix))
            .await
            .map_err(|_| timeout_error("counter read"))??;

        let last_audit_counter = match self.store.max_counter(prefix).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, prefix, "Failed to read last audit counter");
                0
            }
        };

        Ok(CounterStatus {
            prefix: prefix.to_string(),
            current_counter: current,
            next_counter: current + 1,
            last_audit_counter,
            counter_store_healthy: self.counter.ping().await.is_ok(),
            audit_store_healthy: self.store.ping().await.is_ok(),
            queue_healthy: self.queue.ping().await.is_ok(),
            audit_events_lost: self.audit_events_lost(),
        })
    }

    /// Administrative counter reset.
    pub async fn reset(&self, prefix: &str, req: ResetRequest) -> AppResult<ResetResponse> {
        if req.set_to < 0 {
            return Err(AppError::invalid_request("counter value cannot be negative"));
        }
        if req.reason.trim().is_empty() {
            return Err(AppError::invalid_request(
                "reason is required for counter reset",
            ));
        }
        if req.admin_user.trim().is_empty() {
            return Err(AppError::invalid_request(
                "admin user is required for counter reset",
            ));
        }

        let current = timeout(self.timeouts.advance, self.counter.read(prefix))
            .await
            .map_err(|_| timeout_error("counter read"))??;

        if !req.force && req.set_to <= current {
            return Err(AppError::unsafe_reset(req.set_to, current));
        }

        let old = timeout(self.timeouts.advance, self.counter.reset(prefix, req.set_to))
            .await
            .map_err(|_| timeout_error("counter reset"))??;

        // The counter has already been replaced; failures past this
        // point are reported, never unwound.
        let reset_id = Uuid::new_v4().to_string();
        let log = NewResetLog {
            prefix: prefix.to_string(),
            old_value: old,
            new_value: req.set_to,
            reason: req.reason.clone(),
            admin_user: req.admin_user.clone(),
            reset_id: reset_id.clone(),
        };
        if let Err(e) = self.store.insert_reset_log(&log).await {
            tracing::error!(error = %e, prefix, reset_id = %reset_id, "Failed to record counter reset");
        }
        if let Err(e) = self
            .store
            .upsert_checkpoint(prefix, req.set_to, &req.admin_user)
            .await
        {
            tracing::error!(error = %e, prefix, "Failed to update checkpoint after reset");
        }

        tracing::warn!(
            prefix,
            old_value = old,
            new_value = req.set_to,
            admin_user = %req.admin_user,
            reason = %req.reason,
            reset_id = %reset_id,
            "Counter reset performed"
        );

        Ok(ResetResponse {
            message: format!("counter reset from {} to {}", old, req.set_to),
            old_value: old,
            new_value: req.set_to,
            reset_id,
        })
    }

    /// Fetch the stored configuration for a prefix.
    pub async fn get_config(&self, prefix: &str) -> AppResult<PrefixConfig> {
        let config = timeout(self.timeouts.config_read, self.store.get_config(prefix))
            .await
            .map_err(|_| timeout_error("config read"))??;
        config.ok_or_else(|| AppError::unknown_prefix(prefix))
    }

    /// Create or partially update a prefix configuration.
    pub async fn update_config(
        &self,
        prefix: &str,
        req: ConfigUpdateRequest,
    ) -> AppResult<PrefixConfig> {
        if req.admin_user.trim().is_empty() {
            return Err(AppError::invalid_request(
                "admin user is required for config update",
            ));
        }
        if let Some(padding) = req.padding_length {
            if padding < 1 {
                return Err(AppError::invalid_request("padding_length must be positive"));
            }
        }
        if let Some(template) = &req.format_template {
            IdTemplate::validate(template).map_err(AppError::invalid_template)?;
        }

        let existing = self.store.get_config(prefix).await?;
        let config = match existing {
            None if !req.create_if_not_exists => return Err(AppError::unknown_prefix(prefix)),
            None => {
                let mut config =
                    PrefixConfig::with_defaults(prefix, Some(req.admin_user.clone()));
                if let Some(padding) = req.padding_length {
                    config.padding_length = padding;
                }
                if let Some(template) = &req.format_template {
                    config.format_template = template.clone();
                }
                if let Some(rule) = req.reset_rule {
                    config.reset_rule = rule;
                }
                self.store.create_config(&config).await?;
                self.record_config_change(prefix, "create", &req).await;
                config
            }
            Some(_) => {
                let patch = ConfigPatch {
                    padding_length: req.padding_length,
                    format_template: req.format_template.clone(),
                    reset_rule: req.reset_rule,
                    updated_by: req.admin_user.clone(),
                };
                if patch.is_empty() {
                    return Err(AppError::invalid_request("no updates provided"));
                }
                self.store.update_config(prefix, &patch).await?;
                self.record_config_change(prefix, "update", &req).await;
                self.store
                    .get_config(prefix)
                    .await?
                    .ok_or_else(|| AppError::unknown_prefix(prefix))?
            }
        };

        self.cache.invalidate(prefix).await;
        tracing::info!(prefix, admin_user = %req.admin_user, "Prefix configuration written");
        Ok(config)
    }

    /// Audit rows for a prefix, newest counters first.
    pub async fn audit_page(
        &self,
        prefix: &str,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<AuditRow>> {
        let rows = self
            .store
            .audit_page(prefix, limit.clamp(1, 500), offset.max(0))
            .await?;
        Ok(rows)
    }

    /// Component health, as served by the health endpoint.
    pub async fn health(&self) -> HealthStatus {
        let mut components = BTreeMap::new();
        let mut healthy = true;

        match self.counter.ping().await {
            Ok(()) => {
                components.insert("counter_store".to_string(), "healthy".to_string());
            }
            Err(e) => {
                healthy = false;
                components.insert("counter_store".to_string(), format!("unhealthy: {e}"));
            }
        }
        match self.store.ping().await {
            Ok(()) => {
                components.insert("audit_store".to_string(), "healthy".to_string());
            }
            Err(e) => {
                healthy = false;
                components.insert("audit_store".to_string(), format!("unhealthy: {e}"));
            }
        }
        match self.queue.ping().await {
            Ok(()) => {
                components.insert("queue".to_string(), "healthy".to_string());
            }
            Err(e) => {
                healthy = false;
                components.insert("queue".to_string(), format!("unhealthy: {e}"));
            }
        }

        HealthStatus {
            healthy,
            components,
            timestamp: Utc::now(),
        }
    }

    async fn prefix_config(&self, prefix: &str) -> AppResult<Arc<CachedConfig>> {
        if let Some(cached) = self.cache.get(prefix).await {
            return Ok(cached);
        }
        let config = timeout(self.timeouts.config_read, self.store.get_config(prefix))
            .await
            .map_err(|_| timeout_error("config read"))??;
        match config {
            Some(config) => Ok(self.cache.insert(config).await),
            None => Err(AppError::unknown_prefix(prefix)),
        }
    }

    async fn record_config_change(&self, prefix: &str, action: &str, req: &ConfigUpdateRequest) {
        let detail = serde_json::json!({
            "padding_length": req.padding_length,
            "format_template": req.format_template,
            "reset_rule": req.reset_rule,
        });
        if let Err(e) = self
            .store
            .record_config_audit(prefix, action, &req.admin_user, &detail)
            .await
        {
            tracing::error!(error = %e, prefix, "Failed to record config audit entry");
        }
    }
}

/// Publish one audit event; a failure is counted and logged, never
/// surfaced to the caller.
async fn publish_with_accounting(
    queue: &dyn AuditQueue,
    publish_timeout: Duration,
    audit_lost: &AtomicU64,
    event: &AuditEvent,
) {
    let error = match timeout(publish_timeout, queue.publish(event)).await {
        Ok(Ok(())) => return,
        Ok(Err(e)) => e.to_string(),
        Err(_) => "publish timed out".to_string(),
    };
    audit_lost.fetch_add(1, Ordering::Relaxed);
    tracing::error!(
        prefix = %event.prefix,
        counter = event.counter,
        message_id = %event.message_id,
        error = %error,
        "Failed to publish audit event; the issued value is a gap until reconciliation reviews it"
    );
}
