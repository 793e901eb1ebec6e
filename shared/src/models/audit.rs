//! Audit pipeline payloads and durable records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queue payload describing one issuance.
///
/// Field names are the wire contract: consumers in other languages parse
/// this JSON, so renames are breaking changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub message_id: Uuid,
    pub prefix: String,
    pub counter: i64,
    pub full_number: String,
    #[serde(default)]
    pub generated_by: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub correlation_id: Option<String>,
    pub generated_at: DateTime<Utc>,
    pub published_at: DateTime<Utc>,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub batch_id: Option<String>,
}

/// Durable audit record, keyed by `(prefix, counter)` and by `message_id`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRow {
    pub id: i64,
    pub prefix: String,
    pub counter_value: i64,
    pub full_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    pub message_id: Uuid,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,
    pub inserted_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

/// Last counter value the reconciler has confirmed durable for a prefix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub prefix: String,
    pub last_counter_synced: i64,
    pub synced_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synced_by: Option<String>,
}

/// Append-only record of one administrative reset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetLog {
    pub id: i64,
    pub prefix: String,
    pub old_value: i64,
    pub new_value: i64,
    pub reason: String,
    pub admin_user: String,
    pub reset_id: String,
    pub reset_at: DateTime<Utc>,
}

/// Request to reset a counter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetRequest {
    pub set_to: i64,
    pub reason: String,
    pub admin_user: String,
    #[serde(default)]
    pub force: bool,
}

/// Outcome of a reset operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetResponse {
    pub message: String,
    pub old_value: i64,
    pub new_value: i64,
    pub reset_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_wire_format() {
        let event = AuditEvent {
            message_id: Uuid::nil(),
            prefix: "SG".into(),
            counter: 1,
            full_number: "SG000001".into(),
            generated_by: "alice".into(),
            client_id: "erp".into(),
            correlation_id: None,
            generated_at: Utc::now(),
            published_at: Utc::now(),
            retry_count: 0,
            batch_id: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        // Optional fields are absent when unset, required fields keep
        // their wire names.
        assert!(json.contains("\"message_id\""));
        assert!(json.contains("\"full_number\":\"SG000001\""));
        assert!(json.contains("\"retry_count\":0"));
        assert!(!json.contains("correlation_id"));
        assert!(!json.contains("batch_id"));

        let parsed: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.counter, 1);
        assert_eq!(parsed.correlation_id, None);
    }
}
