//! Shared types for the sequential ID service
//!
//! Holds everything both the API server and the audit worker need:
//! the unified error system, the domain models (configs, issued ids,
//! audit events/rows) and small utilities.

pub mod error;
pub mod models;
pub mod util;
