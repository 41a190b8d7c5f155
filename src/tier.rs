//! Tier Resolution
//!
//! TTL cache of each customer's [`TierConfig`] in front of the durable store.

use crate::config::TierResolverConfig;
use crate::models::{CustomerId, TierConfig};
use crate::store::{CustomerStore, StoreResult};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;

/// Resolves a customer's tier limits
pub struct TierResolver {
    store: Arc<dyn CustomerStore>,
    cache: Cache<CustomerId, TierConfig>,
}

impl TierResolver {
    pub fn new(store: Arc<dyn CustomerStore>, config: &TierResolverConfig) -> Self {
        Self::with_ttl(store, config.cache_ttl(), config.cache_capacity)
    }

    pub fn with_ttl(store: Arc<dyn CustomerStore>, ttl: Duration, capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self { store, cache }
    }

    /// Tier limits for `customer_id`, or `None` if the customer or its tier
    /// no longer exists.
    ///
    /// Only hits are cached; a miss is looked up again on the next call.
    /// Concurrent misses may each query the store and the last insert wins.
    pub async fn resolve(&self, customer_id: CustomerId) -> StoreResult<Option<TierConfig>> {
        if let Some(cached) = self.cache.get(&customer_id).await {
            return Ok(Some(cached));
        }

        let Some(tier) = self.store.find_tier_for_customer(customer_id).await? else {
            tracing::warn!(customer_id, "Tier not found for customer");
            return Ok(None);
        };

        let config = tier.config();
        self.cache.insert(customer_id, config.clone()).await;
        Ok(Some(config))
    }

    /// Drop a cached entry
    pub async fn invalidate(&self, customer_id: CustomerId) {
        self.cache.invalidate(&customer_id).await;
    }
}
