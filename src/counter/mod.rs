//! Shared counter store
//!
//! Sliding windows are sorted sets scored by microseconds since the epoch.
//! Quotas are plain integer counters. Every method is one independent atomic
//! operation on the store; callers never hold a lock across calls, so two
//! concurrent requests may observe the same count.

pub mod memory;
pub mod redis_store;

use async_trait::async_trait;
use std::time::Duration;

pub use self::memory::InMemoryCounterStore;
pub use self::redis_store::{RedisCounterConfig, RedisCounterStore};

/// Counter store result type
pub type CounterResult<T> = Result<T, CounterError>;

/// Counter store errors
#[derive(Debug, thiserror::Error)]
pub enum CounterError {
    #[error("counter store unavailable: {0}")]
    Unavailable(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Drop window entries scored at or below `max_score`, then count the rest
    async fn window_trim_and_count(&self, key: &str, max_score: i64) -> CounterResult<u64>;

    /// Add `member` to the window and reset the key's time-to-live
    async fn window_insert(&self, key: &str, score: i64, member: &str, ttl: Duration) -> CounterResult<()>;

    /// Current counter value, 0 if absent
    async fn get_counter(&self, key: &str) -> CounterResult<u64>;

    /// Increment a counter by one. If the key has no expiry afterwards it is
    /// set to expire after `ttl_if_unset`. Returns the new value.
    async fn increment_counter(&self, key: &str, ttl_if_unset: Duration) -> CounterResult<u64>;
}
