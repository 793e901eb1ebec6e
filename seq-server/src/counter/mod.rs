//! Counter engine
//!
//! Atomically advances and reads per-prefix counters held in a fast
//! remote store under `seq:<prefix>` keys. Every uniqueness and
//! monotonicity guarantee the service makes rests on the atomicity of
//! `advance`/`advance_by` at the store; there is deliberately no
//! client-side arithmetic fallback, which would break uniqueness under
//! concurrent callers.
//!
//! The trait is the integration seam: the production implementation
//! talks to Redis, the in-memory one stands in for tests.

mod memory;
mod redis;

pub use memory::MemoryCounterStore;
pub use redis::RedisCounterStore;

use async_trait::async_trait;
use thiserror::Error;

/// Largest batch advance the engine accepts
pub const MAX_BATCH: u32 = 1000;

/// Counter store error types
#[derive(Debug, Error)]
pub enum CounterError {
    /// Backing store unreachable (retryable)
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    /// An optimistic transaction lost a race (retryable)
    #[error("counter store conflict: {0}")]
    Conflict(String),

    /// Batch size outside `[1, MAX_BATCH]`
    #[error("invalid batch size {0}, must be within [1, 1000]")]
    InvalidBatch(u32),
}

/// Counter store seam
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically add 1 to the prefix counter and return the new value.
    async fn advance(&self, prefix: &str) -> Result<i64, CounterError>;

    /// Atomically add `count` and return the end of the issued range
    /// `[end - count + 1, end]`.
    async fn advance_by(&self, prefix: &str, count: u32) -> Result<i64, CounterError>;

    /// Current value. An absent key reads as 0.
    async fn read(&self, prefix: &str) -> Result<i64, CounterError>;

    /// Unconditional write. Reconciliation only; the guarded admin path
    /// goes through [`CounterStore::reset`].
    async fn set(&self, prefix: &str, value: i64) -> Result<(), CounterError>;

    /// Atomically replace the value and return the prior one (0 if the
    /// key was absent).
    async fn reset(&self, prefix: &str, value: i64) -> Result<i64, CounterError>;

    /// Connectivity probe.
    async fn ping(&self) -> Result<(), CounterError>;
}

/// Store key for a prefix counter
pub(crate) fn counter_key(prefix: &str) -> String {
    format!("seq:{prefix}")
}

pub(crate) fn check_batch(count: u32) -> Result<(), CounterError> {
    if count == 0 || count > MAX_BATCH {
        return Err(CounterError::InvalidBatch(count));
    }
    Ok(())
}
