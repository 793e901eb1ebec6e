//! Error category classification

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

/// Error category classification based on error code ranges
///
/// Categories are determined by the error code range:
/// - 0xxx: General errors
/// - 1xxx: Sequence errors
/// - 2xxx: Store errors (transient)
/// - 9xxx: System errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// General errors (0xxx)
    General,
    /// Sequence errors (1xxx)
    Sequence,
    /// Store errors (2xxx) — transient, callers may retry
    Store,
    /// System errors (9xxx)
    System,
}

impl ErrorCategory {
    /// Determine category from error code value
    pub fn from_code(code: u16) -> Self {
        match code {
            0..1000 => Self::General,
            1000..2000 => Self::Sequence,
            2000..3000 => Self::Store,
            _ => Self::System,
        }
    }

    /// Get the string name for this category
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Sequence => "sequence",
            Self::Store => "store",
            Self::System => "system",
        }
    }

    /// Whether errors in this category are transient and worth retrying
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store)
    }
}

impl ErrorCode {
    /// Get the category for this error code
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_from_code() {
        assert_eq!(ErrorCategory::from_code(0), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(8), ErrorCategory::General);
        assert_eq!(ErrorCategory::from_code(999), ErrorCategory::General);

        assert_eq!(ErrorCategory::from_code(1001), ErrorCategory::Sequence);
        assert_eq!(ErrorCategory::from_code(1999), ErrorCategory::Sequence);

        assert_eq!(ErrorCategory::from_code(2001), ErrorCategory::Store);
        assert_eq!(ErrorCategory::from_code(9001), ErrorCategory::System);
        assert_eq!(ErrorCategory::from_code(10000), ErrorCategory::System);
    }

    #[test]
    fn test_error_code_category() {
        assert_eq!(ErrorCode::NotFound.category(), ErrorCategory::General);
        assert_eq!(ErrorCode::UnknownPrefix.category(), ErrorCategory::Sequence);
        assert_eq!(ErrorCode::UnsafeReset.category(), ErrorCategory::Sequence);
        assert_eq!(
            ErrorCode::CounterUnavailable.category(),
            ErrorCategory::Store
        );
        assert_eq!(
            ErrorCode::OperationTimeout.category(),
            ErrorCategory::Store
        );
        assert_eq!(ErrorCode::InternalError.category(), ErrorCategory::System);
    }

    #[test]
    fn test_retryable() {
        assert!(ErrorCode::CounterUnavailable.category().is_retryable());
        assert!(ErrorCode::QueueUnavailable.category().is_retryable());
        assert!(!ErrorCode::UnknownPrefix.category().is_retryable());
        assert!(!ErrorCode::InternalError.category().is_retryable());
    }

    #[test]
    fn test_category_name() {
        assert_eq!(ErrorCategory::General.name(), "general");
        assert_eq!(ErrorCategory::Sequence.name(), "sequence");
        assert_eq!(ErrorCategory::Store.name(), "store");
        assert_eq!(ErrorCategory::System.name(), "system");
    }

    #[test]
    fn test_category_serialize() {
        let json = serde_json::to_string(&ErrorCategory::Store).unwrap();
        assert_eq!(json, "\"store\"");

        let category: ErrorCategory = serde_json::from_str("\"sequence\"").unwrap();
        assert_eq!(category, ErrorCategory::Sequence);
    }
}
