//! Durable store abstraction
//!
//! The gateway treats persistence as opaque: it needs to find a customer by
//! API key hash, join a customer to its tier, and append usage facts.

pub mod memory;

use crate::models::{Customer, CustomerId, Tier, UsageFact};
use async_trait::async_trait;

pub use memory::InMemoryStore;

/// Store result type
pub type StoreResult<T> = Result<T, StoreError>;

/// Store errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("read failed: {0}")]
    Read(String),

    #[error("write failed: {0}")]
    Write(String),
}

/// Customer and tier lookups
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Find the customer owning an API key hash
    async fn find_by_api_key_hash(&self, hash: &str) -> StoreResult<Option<Customer>>;

    /// Join a customer to its tier. `None` if either side is missing.
    async fn find_tier_for_customer(&self, customer_id: CustomerId) -> StoreResult<Option<Tier>>;
}

/// Append-only sink for usage facts
#[async_trait]
pub trait UsageSink: Send + Sync {
    async fn append(&self, fact: UsageFact) -> StoreResult<()>;
}
