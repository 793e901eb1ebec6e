//! Counter status and service health models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Point-in-time view of one counter and its backing stores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterStatus {
    pub prefix: String,
    pub current_counter: i64,
    pub next_counter: i64,
    /// Highest counter value present in the audit store (0 if none)
    pub last_audit_counter: i64,
    pub counter_store_healthy: bool,
    pub audit_store_healthy: bool,
    pub queue_healthy: bool,
    /// Issuances whose audit publish failed since process start
    pub audit_events_lost: u64,
}

/// Aggregated component health, as served by the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub healthy: bool,
    /// Component name -> "healthy" or "unhealthy: <reason>"
    pub components: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
}
