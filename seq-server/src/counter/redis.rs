//! Redis counter store implementation
//!
//! Counters are plain integer keys advanced with `INCR`/`INCRBY`. The
//! admin reset runs as a single server-side script so the read of the
//! prior value and the overwrite are one atomic step.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use super::{check_batch, counter_key, CounterError, CounterStore};

/// Atomic read-then-set, returning the prior value (0 when absent)
const RESET_SCRIPT: &str = r#"
local old = redis.call('GET', KEYS[1])
redis.call('SET', KEYS[1], ARGV[1])
if old then
    return tonumber(old)
end
return 0
"#;

/// Counter store backed by Redis
#[derive(Clone)]
pub struct RedisCounterStore {
    conn: ConnectionManager,
    reset_script: Script,
}

impl RedisCounterStore {
    /// Connect and verify the server responds.
    pub async fn connect(url: &str) -> Result<Self, CounterError> {
        let client = redis::Client::open(url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        let store = Self {
            conn,
            reset_script: Script::new(RESET_SCRIPT),
        };
        store.ping().await?;
        Ok(store)
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn advance(&self, prefix: &str) -> Result<i64, CounterError> {
        let mut conn = self.conn.clone();
        conn.incr(counter_key(prefix), 1_i64)
            .await
            .map_err(unavailable)
    }

    async fn advance_by(&self, prefix: &str, count: u32) -> Result<i64, CounterError> {
        check_batch(count)?;
        let mut conn = self.conn.clone();
        conn.incr(counter_key(prefix), count as i64)
            .await
            .map_err(unavailable)
    }

    async fn read(&self, prefix: &str) -> Result<i64, CounterError> {
        let mut conn = self.conn.clone();
        let value: Option<i64> = conn.get(counter_key(prefix)).await.map_err(unavailable)?;
        Ok(value.unwrap_or(0))
    }

    async fn set(&self, prefix: &str, value: i64) -> Result<(), CounterError> {
        let mut conn = self.conn.clone();
        conn.set(counter_key(prefix), value)
            .await
            .map_err(unavailable)
    }

    async fn reset(&self, prefix: &str, value: i64) -> Result<i64, CounterError> {
        let mut conn = self.conn.clone();
        self.reset_script
            .key(counter_key(prefix))
            .arg(value)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)
    }

    async fn ping(&self) -> Result<(), CounterError> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(())
    }
}

fn unavailable(e: redis::RedisError) -> CounterError {
    CounterError::Unavailable(e.to_string())
}
