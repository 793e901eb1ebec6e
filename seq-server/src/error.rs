//! Bridges store-level errors into the unified [`AppError`]
//!
//! Store enums stay small and vendor-flavored; everything surfaced to a
//! caller goes through these conversions so `?` works end to end
//! without per-call `map_err` boilerplate. Store failures map to the
//! transient (503) codes, validation failures keep their own codes.

use shared::error::{AppError, ErrorCode};

use crate::counter::CounterError;
use crate::db::StoreError;
use crate::queue::QueueError;

impl From<CounterError> for AppError {
    fn from(e: CounterError) -> Self {
        match e {
            CounterError::Unavailable(msg) => {
                AppError::transient(ErrorCode::CounterUnavailable, msg)
            }
            CounterError::Conflict(msg) => AppError::transient(ErrorCode::CounterConflict, msg),
            CounterError::InvalidBatch(count) => {
                AppError::new(ErrorCode::InvalidBatchSize).with_detail("count", count)
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Unavailable(msg) => {
                AppError::transient(ErrorCode::AuditStoreUnavailable, msg)
            }
            StoreError::PrefixNotFound(prefix) => AppError::unknown_prefix(prefix),
        }
    }
}

impl From<QueueError> for AppError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Unavailable(msg) => AppError::transient(ErrorCode::QueueUnavailable, msg),
        }
    }
}

/// Deadline expiry on a store call, surfaced as a retryable error
pub(crate) fn timeout_error(operation: &str) -> AppError {
    AppError::transient(
        ErrorCode::OperationTimeout,
        format!("{operation} timed out"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_error_mapping() {
        let err: AppError = CounterError::Unavailable("refused".into()).into();
        assert_eq!(err.code, ErrorCode::CounterUnavailable);
        assert!(err.is_retryable());

        let err: AppError = CounterError::InvalidBatch(0).into();
        assert_eq!(err.code, ErrorCode::InvalidBatchSize);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_store_error_mapping() {
        let err: AppError = StoreError::PrefixNotFound("SG".into()).into();
        assert_eq!(err.code, ErrorCode::UnknownPrefix);

        let err: AppError = StoreError::Unavailable("gone".into()).into();
        assert_eq!(err.code, ErrorCode::AuditStoreUnavailable);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_timeout_is_retryable() {
        let err = timeout_error("counter advance");
        assert_eq!(err.code, ErrorCode::OperationTimeout);
        assert!(err.is_retryable());
        assert_eq!(err.message, "counter advance timed out");
    }
}
