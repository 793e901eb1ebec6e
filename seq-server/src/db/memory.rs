//! In-memory audit store (tests and same-process runs)

use async_trait::async_trait;
use chrono::Utc;
use shared::models::{AuditEvent, AuditRow, Checkpoint, PrefixConfig, ResetLog};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use super::{AuditStore, ConfigPatch, NewResetLog, StoreError};

#[derive(Default)]
struct Inner {
    configs: HashMap<String, PrefixConfig>,
    rows: Vec<AuditRow>,
    next_row_id: i64,
    checkpoints: HashMap<String, Checkpoint>,
    reset_logs: Vec<ResetLog>,
    config_audits: Vec<(String, String, String)>,
}

/// In-process audit store.
///
/// `fail_inserts(n)` makes the next n audit-row inserts fail, which is
/// how the consumer retry and dead-letter paths are exercised;
/// `set_down` takes the whole store offline.
#[derive(Default)]
pub struct MemoryAuditStore {
    inner: Mutex<Inner>,
    failing_inserts: AtomicU32,
    down: AtomicBool,
}

impl MemoryAuditStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` audit-row inserts fail with a transient error.
    pub fn fail_inserts(&self, n: u32) {
        self.failing_inserts.store(n, Ordering::SeqCst);
    }

    /// Mark the whole store unreachable (or back up).
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn rows_for(&self, prefix: &str) -> Vec<AuditRow> {
        self.inner
            .lock()
            .unwrap()
            .rows
            .iter()
            .filter(|r| r.prefix == prefix)
            .cloned()
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.inner.lock().unwrap().rows.len()
    }

    pub fn reset_logs(&self) -> Vec<ResetLog> {
        self.inner.lock().unwrap().reset_logs.clone()
    }

    pub fn config_audit_count(&self) -> usize {
        self.inner.lock().unwrap().config_audits.len()
    }

    fn check_down(&self) -> Result<(), StoreError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is down".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl AuditStore for MemoryAuditStore {
    async fn get_config(&self, prefix: &str) -> Result<Option<PrefixConfig>, StoreError> {
        self.check_down()?;
        Ok(self.inner.lock().unwrap().configs.get(prefix).cloned())
    }

    async fn list_configs(&self) -> Result<Vec<PrefixConfig>, StoreError> {
        self.check_down()?;
        let mut configs: Vec<PrefixConfig> =
            self.inner.lock().unwrap().configs.values().cloned().collect();
        configs.sort_by(|a, b| a.prefix.cmp(&b.prefix));
        Ok(configs)
    }

    async fn create_config(&self, config: &PrefixConfig) -> Result<(), StoreError> {
        self.check_down()?;
        self.inner
            .lock()
            .unwrap()
            .configs
            .insert(config.prefix.clone(), config.clone());
        Ok(())
    }

    async fn update_config(&self, prefix: &str, patch: &ConfigPatch) -> Result<(), StoreError> {
        self.check_down()?;
        let mut inner = self.inner.lock().unwrap();
        let config = inner
            .configs
            .get_mut(prefix)
            .ok_or_else(|| StoreError::PrefixNotFound(prefix.to_string()))?;
        if let Some(padding) = patch.padding_length {
            config.padding_length = padding;
        }
        if let Some(template) = &patch.format_template {
            config.format_template = template.clone();
        }
        if let Some(rule) = patch.reset_rule {
            config.reset_rule = rule;
        }
        config.updated_by = Some(patch.updated_by.clone());
        config.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_audit_row(&self, event: &AuditEvent) -> Result<(), StoreError> {
        self.check_down()?;
        if self
            .failing_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(StoreError::Unavailable("injected insert failure".into()));
        }
        let mut inner = self.inner.lock().unwrap();
        let duplicate = inner.rows.iter().any(|r| {
            (r.prefix == event.prefix && r.counter_value == event.counter)
                || r.message_id == event.message_id
        });
        if duplicate {
            return Ok(());
        }
        inner.next_row_id += 1;
        let id = inner.next_row_id;
        inner.rows.push(AuditRow {
            id,
            prefix: event.prefix.clone(),
            counter_value: event.counter,
            full_number: event.full_number.clone(),
            generated_by: non_empty(&event.generated_by),
            client_id: non_empty(&event.client_id),
            correlation_id: event.correlation_id.clone(),
            message_id: event.message_id,
            generated_at: event.generated_at,
            published_at: Some(event.published_at),
            inserted_at: Utc::now(),
            batch_id: event.batch_id.clone(),
        });
        Ok(())
    }

    async fn max_counter(&self, prefix: &str) -> Result<i64, StoreError> {
        self.check_down()?;
        Ok(self
            .inner
            .lock()
            .unwrap()
            .rows
            .iter()
            .filter(|r| r.prefix == prefix)
            .map(|r| r.counter_value)
            .max()
            .unwrap_or(0))
    }

    async fn audit_page(
        &self,
        prefix: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditRow>, StoreError> {
        self.check_down()?;
        let mut rows = self.rows_for(prefix);
        rows.sort_by(|a, b| b.counter_value.cmp(&a.counter_value));
        Ok(rows
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn upsert_checkpoint(
        &self,
        prefix: &str,
        last_counter_synced: i64,
        synced_by: &str,
    ) -> Result<(), StoreError> {
        self.check_down()?;
        self.inner.lock().unwrap().checkpoints.insert(
            prefix.to_string(),
            Checkpoint {
                prefix: prefix.to_string(),
                last_counter_synced,
                synced_at: Utc::now(),
                synced_by: Some(synced_by.to_string()),
            },
        );
        Ok(())
    }

    async fn get_checkpoint(&self, prefix: &str) -> Result<Option<Checkpoint>, StoreError> {
        self.check_down()?;
        Ok(self.inner.lock().unwrap().checkpoints.get(prefix).cloned())
    }

    async fn insert_reset_log(&self, log: &NewResetLog) -> Result<(), StoreError> {
        self.check_down()?;
        let mut inner = self.inner.lock().unwrap();
        let id = inner.reset_logs.len() as i64 + 1;
        inner.reset_logs.push(ResetLog {
            id,
            prefix: log.prefix.clone(),
            old_value: log.old_value,
            new_value: log.new_value,
            reason: log.reason.clone(),
            admin_user: log.admin_user.clone(),
            reset_id: log.reset_id.clone(),
            reset_at: Utc::now(),
        });
        Ok(())
    }

    async fn record_config_audit(
        &self,
        prefix: &str,
        action: &str,
        admin_user: &str,
        _detail: &serde_json::Value,
    ) -> Result<(), StoreError> {
        self.check_down()?;
        self.inner.lock().unwrap().config_audits.push((
            prefix.to_string(),
            action.to_string(),
            admin_user.to_string(),
        ));
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.check_down()
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}
