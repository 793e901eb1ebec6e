//! Unified error system for the sequential ID service
//!
//! This module provides a comprehensive error handling system with:
//! - [`ErrorCode`]: Standardized error codes for all error types
//! - [`ErrorCategory`]: Classification of errors by domain
//! - [`AppError`]: Rich error type with codes, messages, and details
//! - [`ApiResponse`]: Unified API response format
//!
//! # Error Code Ranges
//!
//! - 0xxx: General errors
//! - 1xxx: Sequence errors (prefix config, templates, resets)
//! - 2xxx: Store errors (transient; counter store, audit store, queue)
//! - 9xxx: System errors
//!
//! # Example
//!
//! ```
//! use shared::error::{AppError, ErrorCode, ApiResponse};
//!
//! // Create a simple error
//! let err = AppError::new(ErrorCode::UnknownPrefix);
//!
//! // Create an error with custom message
//! let err = AppError::with_message(ErrorCode::InvalidRequest, "reason is required");
//!
//! // Create an error with details
//! let err = AppError::unknown_prefix("SG").with_detail("hint", "create it via the config API");
//!
//! // Convert to API response
//! let response = ApiResponse::<()>::error(&err);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{ApiResponse, AppError, AppResult};
