//! In-process counter store
//!
//! Mirrors the Redis semantics the admission controller relies on (sorted-set
//! trim/insert/count, increment with expiry) for single-instance deployments
//! and tests. Expiry is evaluated lazily against the injected [`Clock`] when a
//! key is touched. Keys that are never read again (last month's quota
//! counters) are dropped by [`InMemoryCounterStore::purge_expired`], which
//! also runs whenever a new counter key is created.

use super::{CounterError, CounterResult, CounterStore};
use crate::clock::Clock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

enum Value {
    Window(Vec<(i64, String)>),
    Counter(u64),
}

struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// DashMap-backed counter store
pub struct InMemoryCounterStore {
    entries: DashMap<String, Entry>,
    clock: Arc<dyn Clock>,
    available: AtomicBool,
}

impl InMemoryCounterStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
            available: AtomicBool::new(true),
        }
    }

    /// Simulate the store going down (`false`) or coming back (`true`)
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Relaxed);
    }

    fn ensure_available(&self) -> CounterResult<()> {
        if self.available.load(Ordering::Relaxed) {
            Ok(())
        } else {
            Err(CounterError::Unavailable("connection refused".into()))
        }
    }

    fn expiry(&self, ttl: Duration) -> Option<DateTime<Utc>> {
        chrono::Duration::from_std(ttl)
            .ok()
            .and_then(|ttl| self.clock.now().checked_add_signed(ttl))
    }

    /// Drop every expired key
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        self.entries.retain(|_, entry| !entry.is_expired(now));
    }

    fn purge_if_expired(&self, key: &str) {
        let now = self.clock.now();
        self.entries.remove_if(key, |_, entry| entry.is_expired(now));
    }

    /// Current counter value without touching availability, for assertions
    pub fn peek_counter(&self, key: &str) -> u64 {
        self.purge_if_expired(key);
        self.entries.get(key).map_or(0, |e| match e.value {
            Value::Counter(v) => v,
            Value::Window(_) => 0,
        })
    }

    /// Expiry of a key, if it has one
    pub fn expires_at(&self, key: &str) -> Option<DateTime<Utc>> {
        self.purge_if_expired(key);
        self.entries.get(key).and_then(|e| e.expires_at)
    }

    fn wrong_type(key: &str) -> CounterError {
        CounterError::Unavailable(format!("WRONGTYPE operation against key {}", key))
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn window_trim_and_count(&self, key: &str, max_score: i64) -> CounterResult<u64> {
        self.ensure_available()?;
        self.purge_if_expired(key);

        let Some(mut entry) = self.entries.get_mut(key) else {
            return Ok(0);
        };
        match &mut entry.value {
            Value::Window(members) => {
                members.retain(|(score, _)| *score > max_score);
                Ok(members.len() as u64)
            }
            Value::Counter(_) => Err(Self::wrong_type(key)),
        }
    }

    async fn window_insert(&self, key: &str, score: i64, member: &str, ttl: Duration) -> CounterResult<()> {
        self.ensure_available()?;
        self.purge_if_expired(key);

        let expires_at = self.expiry(ttl);
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Window(Vec::new()),
            expires_at,
        });
        match &mut entry.value {
            Value::Window(members) => {
                members.retain(|(_, m)| m != member);
                members.push((score, member.to_string()));
            }
            Value::Counter(_) => return Err(Self::wrong_type(key)),
        }
        entry.expires_at = expires_at;
        Ok(())
    }

    async fn get_counter(&self, key: &str) -> CounterResult<u64> {
        self.ensure_available()?;
        self.purge_if_expired(key);

        match self.entries.get(key) {
            None => Ok(0),
            Some(entry) => match entry.value {
                Value::Counter(v) => Ok(v),
                Value::Window(_) => Err(Self::wrong_type(key)),
            },
        }
    }

    async fn increment_counter(&self, key: &str, ttl_if_unset: Duration) -> CounterResult<u64> {
        self.ensure_available()?;
        self.purge_if_expired(key);
        if !self.entries.contains_key(key) {
            self.purge_expired();
        }

        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| Entry {
            value: Value::Counter(0),
            expires_at: None,
        });
        let value = match &mut entry.value {
            Value::Counter(v) => {
                *v += 1;
                *v
            }
            Value::Window(_) => return Err(Self::wrong_type(key)),
        };
        if entry.expires_at.is_none() {
            entry.expires_at = self.expiry(ttl_if_unset);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::TimeZone;

    fn store() -> (Arc<ManualClock>, InMemoryCounterStore) {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 5, 10, 12, 0, 0).unwrap()));
        let store = InMemoryCounterStore::new(clock.clone());
        (clock, store)
    }

    #[tokio::test]
    async fn test_window_trim() {
        let (_, store) = store();
        for score in [10, 20, 30] {
            store
                .window_insert("w", score, &score.to_string(), Duration::from_secs(2))
                .await
                .unwrap();
        }

        assert_eq!(store.window_trim_and_count("w", 0).await.unwrap(), 3);
        assert_eq!(store.window_trim_and_count("w", 20).await.unwrap(), 1);
        assert_eq!(store.window_trim_and_count("missing", 20).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_window_expires() {
        let (clock, store) = store();
        store.window_insert("w", 1, "a", Duration::from_secs(2)).await.unwrap();

        clock.advance(chrono::Duration::seconds(2));
        assert_eq!(store.window_trim_and_count("w", 0).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_increment_keeps_first_expiry() {
        let (clock, store) = store();
        let first_ttl = Duration::from_secs(60);

        assert_eq!(store.increment_counter("q", first_ttl).await.unwrap(), 1);
        let expires_at = store.expires_at("q").unwrap();
        assert_eq!(expires_at, clock.now() + chrono::Duration::seconds(60));

        assert_eq!(store.increment_counter("q", Duration::from_secs(600)).await.unwrap(), 2);
        assert_eq!(store.expires_at("q"), Some(expires_at));

        clock.advance(chrono::Duration::seconds(61));
        assert_eq!(store.get_counter("q").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_new_counter_sweeps_stale_keys() {
        let (clock, store) = store();
        store.increment_counter("quota:1:2026:5", Duration::from_secs(3_600)).await.unwrap();
        store.window_insert("w", 1, "a", Duration::from_secs(2)).await.unwrap();
        assert_eq!(store.entries.len(), 2);

        clock.advance(chrono::Duration::days(30));
        store.increment_counter("quota:1:2026:6", Duration::from_secs(3_600)).await.unwrap();
        assert_eq!(store.entries.len(), 1);
        assert!(store.entries.contains_key("quota:1:2026:6"));
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_live_keys() {
        let (clock, store) = store();
        store.increment_counter("short", Duration::from_secs(5)).await.unwrap();
        store.increment_counter("long", Duration::from_secs(500)).await.unwrap();

        clock.advance(chrono::Duration::seconds(10));
        store.purge_expired();
        assert!(!store.entries.contains_key("short"));
        assert_eq!(store.peek_counter("long"), 1);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let (_, store) = store();
        store.set_available(false);

        assert!(matches!(
            store.get_counter("q").await,
            Err(CounterError::Unavailable(_))
        ));
        assert!(store.window_trim_and_count("w", 0).await.is_err());

        store.set_available(true);
        assert_eq!(store.get_counter("q").await.unwrap(), 0);
    }
}
