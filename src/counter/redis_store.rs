//! Redis-backed counter store
//!
//! Shares rate limiting state across gateway instances. Command and connect
//! timeouts are those of the underlying [`ConnectionManager`]; the store does
//! not add its own.

use super::{CounterResult, CounterStore};
use async_trait::async_trait;
use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, RedisError};
use std::fmt;
use std::time::Duration;

/// Redis connection settings
#[derive(Debug, Clone)]
pub struct RedisCounterConfig {
    pub url: String,
    pub connection_timeout: Duration,
    pub response_timeout: Duration,
}

impl Default for RedisCounterConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/".to_string(),
            connection_timeout: Duration::from_secs(5),
            response_timeout: Duration::from_secs(2),
        }
    }
}

/// Counter store over a multiplexed Redis connection
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: ConnectionManager,
}

impl fmt::Debug for RedisCounterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCounterStore").finish_non_exhaustive()
    }
}

impl RedisCounterStore {
    /// Connect to Redis
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the first connection fails.
    pub async fn connect(config: &RedisCounterConfig) -> Result<Self, RedisError> {
        let client = Client::open(config.url.as_str())?;
        let manager_config = ConnectionManagerConfig::new()
            .set_connection_timeout(config.connection_timeout)
            .set_response_timeout(config.response_timeout);
        let connection = ConnectionManager::new_with_config(client, manager_config).await?;

        Ok(Self { connection })
    }
}

fn ttl_secs(ttl: Duration) -> i64 {
    // EXPIRE 0 deletes the key immediately
    ttl.as_secs().max(1) as i64
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn window_trim_and_count(&self, key: &str, max_score: i64) -> CounterResult<u64> {
        let mut conn = self.connection.clone();
        let _: i64 = conn.zrembyscore(key, "-inf", max_score).await?;
        let count: u64 = conn.zcard(key).await?;
        Ok(count)
    }

    async fn window_insert(&self, key: &str, score: i64, member: &str, ttl: Duration) -> CounterResult<()> {
        let mut conn = self.connection.clone();
        let _: i64 = conn.zadd(key, member, score).await?;
        let _: bool = conn.expire(key, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn get_counter(&self, key: &str) -> CounterResult<u64> {
        let mut conn = self.connection.clone();
        let value: Option<u64> = conn.get(key).await?;
        Ok(value.unwrap_or(0))
    }

    async fn increment_counter(&self, key: &str, ttl_if_unset: Duration) -> CounterResult<u64> {
        let mut conn = self.connection.clone();
        let value: u64 = conn.incr(key, 1u64).await?;

        // -1: key exists without expiry
        let ttl: i64 = conn.ttl(key).await?;
        if ttl == -1 {
            let _: bool = conn.expire(key, ttl_secs(ttl_if_unset)).await?;
        }
        Ok(value)
    }
}
