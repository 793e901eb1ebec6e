//! Issued identifier and batch payloads

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One generated identifier, as returned to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedId {
    pub prefix: String,
    pub counter: i64,
    pub full_number: String,
    pub message_id: Uuid,
    pub generated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub client_id: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub generated_by: String,
}

/// Request for a batch of identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchRequest {
    pub count: u32,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub generated_by: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub correlation_id: Option<String>,
}

/// Response carrying a batch of identifiers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResponse {
    pub ids: Vec<IssuedId>,
    pub batch_id: String,
    pub count: u32,
    pub generated_at: DateTime<Utc>,
}
