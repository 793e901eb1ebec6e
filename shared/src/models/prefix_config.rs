//! Prefix configuration model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// When a counter is expected to roll over.
///
/// The rule is stored and reported but never applied automatically;
/// rollovers happen through the administrative reset endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResetRule {
    #[default]
    Never,
    Daily,
    Monthly,
    Yearly,
}

impl ResetRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Never => "never",
            Self::Daily => "daily",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "never" => Some(Self::Never),
            "daily" => Some(Self::Daily),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            _ => None,
        }
    }
}

/// Per-prefix configuration entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixConfig {
    pub prefix: String,
    /// Zero-pad width used by the fallback format
    pub padding_length: i32,
    /// Printf-style template, validated on write (see the formatter)
    pub format_template: String,
    pub reset_rule: ResetRule,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_reset_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl PrefixConfig {
    /// A fresh config with service defaults, as created through the
    /// config endpoint when only a prefix is supplied.
    pub fn with_defaults(prefix: impl Into<String>, created_by: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            prefix: prefix.into(),
            padding_length: 6,
            format_template: "%s%06d".to_string(),
            reset_rule: ResetRule::Never,
            last_reset_at: None,
            created_at: now,
            updated_at: now,
            created_by,
            updated_by: None,
        }
    }
}

/// Partial update payload for a prefix configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigUpdateRequest {
    pub padding_length: Option<i32>,
    pub format_template: Option<String>,
    pub reset_rule: Option<ResetRule>,
    pub admin_user: String,
    #[serde(default)]
    pub create_if_not_exists: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reset_rule_round_trip() {
        for rule in [
            ResetRule::Never,
            ResetRule::Daily,
            ResetRule::Monthly,
            ResetRule::Yearly,
        ] {
            assert_eq!(ResetRule::parse(rule.as_str()), Some(rule));
        }
        assert_eq!(ResetRule::parse("weekly"), None);
    }

    #[test]
    fn test_reset_rule_serde() {
        assert_eq!(serde_json::to_string(&ResetRule::Monthly).unwrap(), "\"monthly\"");
        let rule: ResetRule = serde_json::from_str("\"never\"").unwrap();
        assert_eq!(rule, ResetRule::Never);
    }

    #[test]
    fn test_update_request_defaults() {
        let req: ConfigUpdateRequest =
            serde_json::from_str(r#"{"admin_user":"ops"}"#).unwrap();
        assert!(req.padding_length.is_none());
        assert!(!req.create_if_not_exists);
    }
}
