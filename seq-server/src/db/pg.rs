//! PostgreSQL audit store implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shared::models::{AuditEvent, AuditRow, Checkpoint, PrefixConfig, ResetRule};
use sqlx::PgPool;
use uuid::Uuid;

use super::{AuditStore, ConfigPatch, NewResetLog, StoreError};

/// Audit store backed by PostgreSQL
#[derive(Clone)]
pub struct PgAuditStore {
    pool: PgPool,
}

impl PgAuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ConfigRow {
    prefix: String,
    padding_length: i32,
    format_template: String,
    reset_rule: String,
    last_reset_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    created_by: Option<String>,
    updated_by: Option<String>,
}

impl From<ConfigRow> for PrefixConfig {
    fn from(row: ConfigRow) -> Self {
        let reset_rule = ResetRule::parse(&row.reset_rule).unwrap_or_else(|| {
            tracing::warn!(
                prefix = %row.prefix,
                reset_rule = %row.reset_rule,
                "Unknown reset_rule in seq_config, treating as never"
            );
            ResetRule::Never
        });
        Self {
            prefix: row.prefix,
            padding_length: row.padding_length,
            format_template: row.format_template,
            reset_rule,
            last_reset_at: row.last_reset_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            created_by: row.created_by,
            updated_by: row.updated_by,
        }
    }
}

#[derive(sqlx::FromRow)]
struct LogRow {
    id: i64,
    prefix: String,
    counter_value: i64,
    full_number: String,
    generated_by: Option<String>,
    client_id: Option<String>,
    correlation_id: Option<String>,
    message_id: Uuid,
    generated_at: DateTime<Utc>,
    published_at: Option<DateTime<Utc>>,
    inserted_at: DateTime<Utc>,
    batch_id: Option<String>,
}

impl From<LogRow> for AuditRow {
    fn from(row: LogRow) -> Self {
        Self {
            id: row.id,
            prefix: row.prefix,
            counter_value: row.counter_value,
            full_number: row.full_number,
            generated_by: row.generated_by,
            client_id: row.client_id,
            correlation_id: row.correlation_id,
            message_id: row.message_id,
            generated_at: row.generated_at,
            published_at: row.published_at,
            inserted_at: row.inserted_at,
            batch_id: row.batch_id,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CheckpointRow {
    prefix: String,
    last_counter_synced: i64,
    synced_at: DateTime<Utc>,
    synced_by: Option<String>,
}

/// Store NULL instead of empty caller metadata
fn opt(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[async_trait]
impl AuditStore for PgAuditStore {
    async fn get_config(&self, prefix: &str) -> Result<Option<PrefixConfig>, StoreError> {
        let row: Option<ConfigRow> = sqlx::query_as(
            "SELECT prefix, padding_length, format_template, reset_rule, last_reset_at,
                    created_at, updated_at, created_by, updated_by
             FROM seq_config
             WHERE prefix = $1",
        )
        .bind(prefix)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn list_configs(&self) -> Result<Vec<PrefixConfig>, StoreError> {
        let rows: Vec<ConfigRow> = sqlx::query_as(
            "SELECT prefix, padding_length, format_template, reset_rule, last_reset_at,
                    created_at, updated_at, created_by, updated_by
             FROM seq_config
             ORDER BY prefix",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create_config(&self, config: &PrefixConfig) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO seq_config (prefix, padding_length, format_template, reset_rule, created_by)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&config.prefix)
        .bind(config.padding_length)
        .bind(&config.format_template)
        .bind(config.reset_rule.as_str())
        .bind(config.created_by.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_config(&self, prefix: &str, patch: &ConfigPatch) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE seq_config
             SET padding_length = COALESCE($2, padding_length),
                 format_template = COALESCE($3, format_template),
                 reset_rule = COALESCE($4, reset_rule),
                 updated_by = $5,
                 updated_at = NOW()
             WHERE prefix = $1",
        )
        .bind(prefix)
        .bind(patch.padding_length)
        .bind(patch.format_template.as_deref())
        .bind(patch.reset_rule.map(|r| r.as_str()))
        .bind(&patch.updated_by)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::PrefixNotFound(prefix.to_string()));
        }
        Ok(())
    }

    async fn insert_audit_row(&self, event: &AuditEvent) -> Result<(), StoreError> {
        // No conflict target: a duplicate on either unique key
        // ((prefix, counter_value) or message_id) is a redelivery and
        // counts as success.
        sqlx::query(
            "INSERT INTO seq_log (prefix, counter_value, full_number, generated_by, client_id,
                                  correlation_id, message_id, generated_at, published_at, batch_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             ON CONFLICT DO NOTHING",
        )
        .bind(&event.prefix)
        .bind(event.counter)
        .bind(&event.full_number)
        .bind(opt(&event.generated_by))
        .bind(opt(&event.client_id))
        .bind(event.correlation_id.as_deref())
        .bind(event.message_id)
        .bind(event.generated_at)
        .bind(event.published_at)
        .bind(event.batch_id.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn max_counter(&self, prefix: &str) -> Result<i64, StoreError> {
        let max: i64 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(counter_value), 0) FROM seq_log WHERE prefix = $1",
        )
        .bind(prefix)
        .fetch_one(&self.pool)
        .await?;
        Ok(max)
    }

    async fn audit_page(
        &self,
        prefix: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AuditRow>, StoreError> {
        let rows: Vec<LogRow> = sqlx::query_as(
            "SELECT id, prefix, counter_value, full_number, generated_by, client_id,
                    correlation_id, message_id, generated_at, published_at, inserted_at, batch_id
             FROM seq_log
             WHERE prefix = $1
             ORDER BY counter_value DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(prefix)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upsert_checkpoint(
        &self,
        prefix: &str,
        last_counter_synced: i64,
        synced_by: &str,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO seq_checkpoint (prefix, last_counter_synced, synced_by)
             VALUES ($1, $2, $3)
             ON CONFLICT (prefix)
             DO UPDATE SET last_counter_synced = EXCLUDED.last_counter_synced,
                           synced_at = NOW(),
                           synced_by = EXCLUDED.synced_by",
        )
        .bind(prefix)
        .bind(last_counter_synced)
        .bind(synced_by)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_checkpoint(&self, prefix: &str) -> Result<Option<Checkpoint>, StoreError> {
        let row: Option<CheckpointRow> = sqlx::query_as(
            "SELECT prefix, last_counter_synced, synced_at, synced_by
             FROM seq_checkpoint
             WHERE prefix = $1",
        )
        .bind(prefix)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|r| Checkpoint {
            prefix: r.prefix,
            last_counter_synced: r.last_counter_synced,
            synced_at: r.synced_at,
            synced_by: r.synced_by,
        }))
    }

    async fn insert_reset_log(&self, log: &NewResetLog) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO seq_reset_log (prefix, old_value, new_value, reason, admin_user, reset_id)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&log.prefix)
        .bind(log.old_value)
        .bind(log.new_value)
        .bind(&log.reason)
        .bind(&log.admin_user)
        .bind(&log.reset_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn record_config_audit(
        &self,
        prefix: &str,
        action: &str,
        admin_user: &str,
        detail: &serde_json::Value,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO seq_config_audit (prefix, action, admin_user, detail)
             VALUES ($1, $2, $3, $4)",
        )
        .bind(prefix)
        .bind(action)
        .bind(admin_user)
        .bind(detail)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
