//! Audit store
//!
//! The authoritative record of everything that has been issued, plus
//! the prefix configuration tables, checkpoints and reset history.
//! Audit rows are unique on `(prefix, counter_value)` and on
//! `message_id`; insertion treats a unique-key conflict as success,
//! which is what turns the queue's at-least-once delivery into an
//! exactly-once audit trail.

mod memory;
mod pg;

pub use memory::MemoryAuditStore;
pub use pg::PgAuditStore;

use async_trait::async_trait;
use shared::models::{AuditEvent, AuditRow, Checkpoint, PrefixConfig, ResetRule};
use thiserror::Error;

/// Audit store error types
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store unreachable or the statement failed (retryable)
    #[error("audit store unavailable: {0}")]
    Unavailable(String),

    /// Update targeted a prefix that does not exist
    #[error("prefix {0} not found")]
    PrefixNotFound(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

/// Partial update applied to an existing prefix configuration
#[derive(Debug, Clone)]
pub struct ConfigPatch {
    pub padding_length: Option<i32>,
    pub format_template: Option<String>,
    pub reset_rule: Option<ResetRule>,
    pub updated_by: String,
}

impl ConfigPatch {
    pub fn is_empty(&self) -> bool {
        self.padding_length.is_none()
            && self.format_template.is_none()
            && self.reset_rule.is_none()
    }
}

/// A reset about to be recorded (ids and timestamps are store-assigned)
#[derive(Debug, Clone)]
pub struct NewResetLog {
    pub prefix: String,
    pub old_value: i64,
    pub new_value: i64,
    pub reason: String,
    pub admin_user: String,
    pub reset_id: String,
}

/// Audit store seam
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn get_config(&self, prefix: &str) -> Result<Option<PrefixConfig>, StoreError>;

    async fn list_configs(&self) -> Result<Vec<PrefixConfig>, StoreError>;

    async fn create_config(&self, config: &PrefixConfig) -> Result<(), StoreError>;

    async fn update_config(&self, prefix: &str, patch: &ConfigPatch) -> Result<(), StoreError>;

    /// Insert one audit row. Idempotent: a row already present under
    /// the same `(prefix, counter_value)` or `message_id` is success.
    async fn insert_audit_row(&self, event: &AuditEvent) -> Result<(), StoreError>;

    /// Highest counter value recorded for a prefix (0 if none).
    async fn max_counter(&self, prefix: &str) -> Result<i64, StoreError>;

    /// Audit rows for a prefix, newest counters first.
    async fn audit_page(
        &self,
        prefix: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditRow>, StoreError>;

    async fn upsert_checkpoint(
        &self,
        prefix: &str,
        last_counter_synced: i64,
        synced_by: &str,
    ) -> Result<(), StoreError>;

    async fn get_checkpoint(&self, prefix: &str) -> Result<Option<Checkpoint>, StoreError>;

    async fn insert_reset_log(&self, log: &NewResetLog) -> Result<(), StoreError>;

    /// Append one row to the config change history.
    async fn record_config_audit(
        &self,
        prefix: &str,
        action: &str,
        admin_user: &str,
        detail: &serde_json::Value,
    ) -> Result<(), StoreError>;

    /// Connectivity probe.
    async fn ping(&self) -> Result<(), StoreError>;
}
