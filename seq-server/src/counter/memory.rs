//! In-memory counter store (tests and same-process runs)

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{check_batch, CounterError, CounterStore};

/// In-process counter store.
///
/// Supports injected failures so transient paths can be exercised:
/// queued errors are returned by the next operations, and `set_down`
/// makes everything (including ping) fail until cleared.
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<String, i64>>,
    injected: Mutex<Vec<CounterError>>,
    down: AtomicBool,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an error to be returned by the next counter operation.
    pub fn inject_failure(&self, err: CounterError) {
        self.injected.lock().unwrap().push(err);
    }

    /// Mark the whole store unreachable (or back up).
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    fn check_injected(&self) -> Result<(), CounterError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(CounterError::Unavailable("store is down".into()));
        }
        let mut injected = self.injected.lock().unwrap();
        if injected.is_empty() {
            Ok(())
        } else {
            Err(injected.remove(0))
        }
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn advance(&self, prefix: &str) -> Result<i64, CounterError> {
        self.check_injected()?;
        let mut counters = self.counters.lock().unwrap();
        let value = counters.entry(prefix.to_string()).or_insert(0);
        *value += 1;
        Ok(*value)
    }

    async fn advance_by(&self, prefix: &str, count: u32) -> Result<i64, CounterError> {
        check_batch(count)?;
        self.check_injected()?;
        let mut counters = self.counters.lock().unwrap();
        let value = counters.entry(prefix.to_string()).or_insert(0);
        *value += count as i64;
        Ok(*value)
    }

    async fn read(&self, prefix: &str) -> Result<i64, CounterError> {
        self.check_injected()?;
        Ok(*self.counters.lock().unwrap().get(prefix).unwrap_or(&0))
    }

    async fn set(&self, prefix: &str, value: i64) -> Result<(), CounterError> {
        self.check_injected()?;
        self.counters
            .lock()
            .unwrap()
            .insert(prefix.to_string(), value);
        Ok(())
    }

    async fn reset(&self, prefix: &str, value: i64) -> Result<i64, CounterError> {
        self.check_injected()?;
        let mut counters = self.counters.lock().unwrap();
        let old = counters.insert(prefix.to_string(), value).unwrap_or(0);
        Ok(old)
    }

    async fn ping(&self) -> Result<(), CounterError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(CounterError::Unavailable("store is down".into()));
        }
        Ok(())
    }
}
