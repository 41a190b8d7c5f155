//! In-memory store (for development, tests and the default binary)

use super::{CustomerStore, StoreError, StoreResult, UsageSink};
use crate::middleware::auth::hash_api_key;
use crate::models::{Customer, CustomerId, Tier, TierId, UsageFact};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

/// API keys of the seeded customers
pub mod seed_keys {
    pub const FREE: &str = "sk_mgw_7f3a9b2c4e1d8f6a";
    pub const PRO: &str = "sk_mgw_a8c2e5f1b9d4e7a3";
}

#[derive(Default)]
struct Tables {
    tiers: HashMap<TierId, Tier>,
    customers: HashMap<CustomerId, Customer>,
    by_key_hash: HashMap<String, CustomerId>,
    usage: Vec<UsageFact>,
}

/// In-memory customer/tier/usage store
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    next_id: AtomicI64,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            next_id: AtomicI64::new(1),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Store holding the Free and Pro tiers and one customer on each
    pub fn seeded() -> Self {
        let store = Self::new();
        let free = store.add_tier("Free", 1_000, 2, dec!(0));
        let pro = store.add_tier("Pro", 100_000, 10, dec!(50));

        // Fresh store, hashes cannot collide
        let _ = store.add_customer("seed-free-tier", free.id, seed_keys::FREE);
        let _ = store.add_customer("seed-pro-tier", pro.id, seed_keys::PRO);
        store
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn add_tier(&self, name: &str, monthly_quota: u64, requests_per_second: u64, price: Decimal) -> Tier {
        let tier = Tier {
            id: self.next_id(),
            name: name.to_string(),
            monthly_quota,
            requests_per_second,
            monthly_price_usd: price,
        };
        self.tables.write().tiers.insert(tier.id, tier.clone());
        tier
    }

    /// Register a customer under the hash of `api_key`
    pub fn add_customer(&self, external_id: &str, tier_id: TierId, api_key: &str) -> StoreResult<Customer> {
        let hash = hash_api_key(api_key);
        let mut tables = self.tables.write();
        if tables.by_key_hash.contains_key(&hash) {
            return Err(StoreError::Conflict(format!("api key already assigned ({})", external_id)));
        }

        let customer = Customer {
            id: self.next_id(),
            external_id: external_id.to_string(),
            tier_id,
            api_key_hash: hash.clone(),
            created_at: Utc::now(),
        };
        tables.by_key_hash.insert(hash, customer.id);
        tables.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    pub fn remove_customer(&self, id: CustomerId) -> StoreResult<()> {
        let mut tables = self.tables.write();
        let customer = tables
            .customers
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("customer {}", id)))?;
        tables.by_key_hash.remove(&customer.api_key_hash);
        Ok(())
    }

    pub fn remove_tier(&self, id: TierId) -> StoreResult<()> {
        self.tables
            .write()
            .tiers
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("tier {}", id)))
    }

    /// Snapshot of recorded usage
    pub fn usage_facts(&self) -> Vec<UsageFact> {
        self.tables.read().usage.clone()
    }

    /// Make every subsequent write fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CustomerStore for InMemoryStore {
    async fn find_by_api_key_hash(&self, hash: &str) -> StoreResult<Option<Customer>> {
        let tables = self.tables.read();
        Ok(tables
            .by_key_hash
            .get(hash)
            .and_then(|id| tables.customers.get(id))
            .cloned())
    }

    async fn find_tier_for_customer(&self, customer_id: CustomerId) -> StoreResult<Option<Tier>> {
        let tables = self.tables.read();
        Ok(tables
            .customers
            .get(&customer_id)
            .and_then(|c| tables.tiers.get(&c.tier_id))
            .cloned())
    }
}

#[async_trait]
impl UsageSink for InMemoryStore {
    async fn append(&self, fact: UsageFact) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(StoreError::Write("usage log unavailable".into()));
        }
        self.tables.write().usage.push(fact);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn test_seeded_store() {
        let store = InMemoryStore::seeded();

        let free = store
            .find_by_api_key_hash(&hash_api_key(seed_keys::FREE))
            .await
            .unwrap()
            .expect("seeded free customer");
        assert_eq!(free.external_id, "seed-free-tier");

        let tier = store.find_tier_for_customer(free.id).await.unwrap().unwrap();
        assert_eq!(tier.name, "Free");
        assert_eq!(tier.monthly_quota, 1_000);
        assert_eq!(tier.requests_per_second, 2);
    }

    #[tokio::test]
    async fn test_api_key_hash_is_unique() {
        let store = InMemoryStore::new();
        let tier = store.add_tier("Free", 10, 1, dec!(0));

        assert_ok!(store.add_customer("a", tier.id, "key-1"));
        assert_err!(store.add_customer("b", tier.id, "key-1"));
    }

    #[tokio::test]
    async fn test_missing_tier_resolves_to_none() {
        let store = InMemoryStore::new();
        let tier = store.add_tier("Free", 10, 1, dec!(0));
        let customer = store.add_customer("a", tier.id, "key-1").unwrap();

        store.remove_tier(tier.id).unwrap();
        assert!(store.find_tier_for_customer(customer.id).await.unwrap().is_none());

        store.remove_customer(customer.id).unwrap();
        assert!(store
            .find_by_api_key_hash(&hash_api_key("key-1"))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_failing_writes() {
        let store = InMemoryStore::new();
        store.set_fail_writes(true);

        let fact = UsageFact {
            customer_id: 1,
            user_id: None,
            endpoint: "/api/data".into(),
            method: "GET".into(),
            timestamp: Utc::now(),
            response_status: 200,
        };
        assert!(matches!(store.append(fact).await, Err(StoreError::Write(_))));
        assert!(store.usage_facts().is_empty());
    }
}
