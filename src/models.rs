//! Gateway Models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Customer identifier
pub type CustomerId = i64;

/// Tier identifier
pub type TierId = i64;

// ============ Customers ============

/// API customer. Only the SHA-256 hash of the API key is ever stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: CustomerId,
    pub external_id: String,
    pub tier_id: TierId,
    pub api_key_hash: String,
    pub created_at: DateTime<Utc>,
}

// ============ Tiers ============

/// Subscription tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tier {
    pub id: TierId,
    pub name: String,
    pub monthly_quota: u64,
    pub requests_per_second: u64,
    pub monthly_price_usd: Decimal,
}

impl Tier {
    /// Project the limits handed to the admission controller
    pub fn config(&self) -> TierConfig {
        TierConfig {
            monthly_quota: self.monthly_quota,
            requests_per_second: self.requests_per_second,
            monthly_price_usd: self.monthly_price_usd,
        }
    }
}

/// Limits of a tier, decoupled from the customer/tier relation.
///
/// This is the value that gets cached per customer by the
/// [`TierResolver`](crate::tier::TierResolver).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierConfig {
    pub monthly_quota: u64,
    pub requests_per_second: u64,
    pub monthly_price_usd: Decimal,
}

// ============ Usage ============

/// One completed, billable call. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageFact {
    pub customer_id: CustomerId,
    pub user_id: Option<String>,
    pub endpoint: String,
    pub method: String,
    pub timestamp: DateTime<Utc>,
    pub response_status: u16,
}

// ============ Responses ============

/// Error body for 401, 403, 500 and 503 responses
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub code: String,
}

impl ErrorBody {
    pub fn new(error: &str, code: &str) -> Self {
        Self {
            error: error.to_string(),
            code: code.to_string(),
        }
    }
}

/// Body of a 429 response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitedBody {
    pub error: String,
    pub code: String,
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
    pub retry_after: Option<u64>,
}
