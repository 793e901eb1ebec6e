//! Unified error codes for the sequential ID service
//!
//! This module defines all error codes used by the API server, the audit
//! worker and clients. Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Sequence errors
//! - 2xxx: Store errors (transient)
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 1xxx: Sequence ====================
    /// No configuration exists for the requested prefix
    UnknownPrefix = 1001,
    /// Batch size is outside the allowed range
    InvalidBatchSize = 1002,
    /// Format template has no integer placeholder or cannot render
    InvalidTemplate = 1003,
    /// Reset would not increase the counter and force was not set
    UnsafeReset = 1004,
    /// Reset rule is not one of never/daily/monthly/yearly
    InvalidResetRule = 1005,

    // ==================== 2xxx: Store (transient) ====================
    /// Counter store is unreachable
    CounterUnavailable = 2001,
    /// Counter store transaction conflict (retryable)
    CounterConflict = 2002,
    /// Audit store is unreachable
    AuditStoreUnavailable = 2003,
    /// Message queue is unreachable
    QueueUnavailable = 2004,
    /// A store call exceeded its deadline
    OperationTimeout = 2005,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9003,
}

impl ErrorCode {
    /// Get the numeric code value
    pub fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the default human-readable message for this error code
    pub fn message(&self) -> &'static str {
        match self {
            Self::Success => "OK",
            Self::Unknown => "Unknown error",
            Self::ValidationFailed => "Validation failed",
            Self::NotFound => "Resource not found",
            Self::AlreadyExists => "Resource already exists",
            Self::InvalidRequest => "Invalid request",
            Self::InvalidFormat => "Invalid format",
            Self::RequiredField => "Required field missing",
            Self::ValueOutOfRange => "Value out of range",

            Self::UnknownPrefix => "Prefix is not configured",
            Self::InvalidBatchSize => "Batch size must be between 1 and 1000",
            Self::InvalidTemplate => "Format template is invalid",
            Self::UnsafeReset => "Reset would not increase the counter (use force=true to override)",
            Self::InvalidResetRule => "Reset rule must be never, daily, monthly or yearly",

            Self::CounterUnavailable => "Counter store is unavailable",
            Self::CounterConflict => "Counter store conflict, retry the operation",
            Self::AuditStoreUnavailable => "Audit store is unavailable",
            Self::QueueUnavailable => "Message queue is unavailable",
            Self::OperationTimeout => "Operation timed out",

            Self::InternalError => "Internal server error",
            Self::DatabaseError => "Database error",
            Self::ConfigError => "Configuration error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> u16 {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        let code = match value {
            0 => Self::Success,
            1 => Self::Unknown,
            2 => Self::ValidationFailed,
            3 => Self::NotFound,
            4 => Self::AlreadyExists,
            5 => Self::InvalidRequest,
            6 => Self::InvalidFormat,
            7 => Self::RequiredField,
            8 => Self::ValueOutOfRange,

            1001 => Self::UnknownPrefix,
            1002 => Self::InvalidBatchSize,
            1003 => Self::InvalidTemplate,
            1004 => Self::UnsafeReset,
            1005 => Self::InvalidResetRule,

            2001 => Self::CounterUnavailable,
            2002 => Self::CounterConflict,
            2003 => Self::AuditStoreUnavailable,
            2004 => Self::QueueUnavailable,
            2005 => Self::OperationTimeout,

            9001 => Self::InternalError,
            9002 => Self::DatabaseError,
            9003 => Self::ConfigError,

            other => return Err(InvalidErrorCode(other)),
        };
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::UnknownPrefix.code(), 1001);
        assert_eq!(ErrorCode::CounterUnavailable.code(), 2001);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_round_trip() {
        for code in [
            ErrorCode::Success,
            ErrorCode::UnknownPrefix,
            ErrorCode::InvalidBatchSize,
            ErrorCode::UnsafeReset,
            ErrorCode::CounterConflict,
            ErrorCode::OperationTimeout,
            ErrorCode::DatabaseError,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_invalid_code() {
        assert_eq!(ErrorCode::try_from(424), Err(InvalidErrorCode(424)));
    }

    #[test]
    fn test_serialize_as_u16() {
        let json = serde_json::to_string(&ErrorCode::UnknownPrefix).unwrap();
        assert_eq!(json, "1001");
        let code: ErrorCode = serde_json::from_str("2005").unwrap();
        assert_eq!(code, ErrorCode::OperationTimeout);
    }
}
