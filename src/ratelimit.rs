//! Admission Control
//!
//! Two independent budgets per customer, checked in order:
//!
//! 1. a per-second sliding window held as a sorted set of request timestamps
//! 2. a monthly quota counter keyed by customer, year and month
//!
//! The check consumes a window slot but never touches the quota. Quota is
//! charged by [`AdmissionController::commit_quota`], called by the usage
//! recorder once a request has succeeded.

use crate::clock::{end_of_month, Clock};
use crate::config::{RateLimitConfig, MAX_SLIDING_WINDOW_SECONDS};
use crate::constants::keys;
use crate::counter::{CounterResult, CounterStore};
use crate::models::{CustomerId, TierConfig};
use chrono::{DateTime, Datelike, Utc};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Outcome of an admission check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionDecision {
    pub allowed: bool,
    /// Seconds the caller should wait, `None` when allowed
    pub retry_after_secs: Option<u64>,
    /// Ceiling that decided the outcome: requests per second on a window
    /// denial, the monthly quota otherwise
    pub limit: u64,
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
    pub is_quota_exceeded: bool,
}

/// Sliding window + monthly quota admission controller
pub struct AdmissionController {
    counters: Arc<dyn CounterStore>,
    clock: Arc<dyn Clock>,
    window_secs: u64,
    enable_quota_checking: bool,
}

impl AdmissionController {
    /// The window is clamped to `1..=MAX_SLIDING_WINDOW_SECONDS`, so a
    /// config that skipped [`crate::config::GatewayConfig::validate`] still
    /// yields bounded durations.
    pub fn new(counters: Arc<dyn CounterStore>, clock: Arc<dyn Clock>, config: &RateLimitConfig) -> Self {
        Self {
            counters,
            clock,
            window_secs: config.sliding_window_seconds.clamp(1, MAX_SLIDING_WINDOW_SECONDS),
            enable_quota_checking: config.enable_quota_checking,
        }
    }

    /// Sorted-set key of the per-second window
    pub fn window_key(customer_id: CustomerId) -> String {
        format!("{}{}:second", keys::RATE_LIMIT_PREFIX, customer_id)
    }

    /// Counter key of the monthly quota for the month containing `at`
    pub fn quota_key(customer_id: CustomerId, at: DateTime<Utc>) -> String {
        format!("{}{}:{}:{}", keys::QUOTA_PREFIX, customer_id, at.year(), at.month())
    }

    /// Check both budgets and consume a window slot if admitted.
    ///
    /// # Errors
    /// Fails if the counter store cannot be reached; that is neither an
    /// admission nor a denial.
    pub async fn check(&self, customer_id: CustomerId, tier: &TierConfig) -> CounterResult<AdmissionDecision> {
        let now = self.clock.now();
        let month_end = end_of_month(now);

        // 1) Per-second sliding window
        let window_key = Self::window_key(customer_id);
        let window_start = now - chrono::Duration::seconds(self.window_secs as i64);
        let in_window = self
            .counters
            .window_trim_and_count(&window_key, window_start.timestamp_micros())
            .await?;

        if in_window >= tier.requests_per_second {
            tracing::warn!(
                customer_id,
                limit = tier.requests_per_second,
                current = in_window,
                "Rate limit exceeded"
            );
            return Ok(AdmissionDecision {
                allowed: false,
                retry_after_secs: Some(1),
                limit: tier.requests_per_second,
                remaining: 0,
                reset_at: now + chrono::Duration::seconds(1),
                is_quota_exceeded: false,
            });
        }

        // 2) Monthly quota, read only
        let mut used = 0;
        if self.enable_quota_checking {
            used = self.counters.get_counter(&Self::quota_key(customer_id, now)).await?;
            if used >= tier.monthly_quota {
                tracing::warn!(
                    customer_id,
                    limit = tier.monthly_quota,
                    current = used,
                    "Monthly quota exceeded"
                );
                return Ok(AdmissionDecision {
                    allowed: false,
                    retry_after_secs: Some((month_end - now).num_seconds().max(0) as u64),
                    limit: tier.monthly_quota,
                    remaining: 0,
                    reset_at: month_end,
                    is_quota_exceeded: true,
                });
            }
        }

        // 3) Take the window slot
        let score = now.timestamp_micros();
        let member = format!("{}-{}", score, Uuid::new_v4().simple());
        self.counters
            .window_insert(&window_key, score, &member, Duration::from_secs(self.window_secs + 1))
            .await?;

        let remaining = if self.enable_quota_checking {
            tier.monthly_quota.saturating_sub(used + 1)
        } else {
            tier.monthly_quota
        };

        Ok(AdmissionDecision {
            allowed: true,
            retry_after_secs: None,
            limit: tier.monthly_quota,
            remaining,
            reset_at: month_end,
            is_quota_exceeded: false,
        })
    }

    /// Charge one request against this month's quota.
    ///
    /// The counter expires at month end; the expiry is only set when the key
    /// has none yet.
    pub async fn commit_quota(&self, customer_id: CustomerId) -> CounterResult<u64> {
        let now = self.clock.now();
        let key = Self::quota_key(customer_id, now);
        let ttl = (end_of_month(now) - now).to_std().unwrap_or(Duration::from_secs(1));

        self.counters.increment_counter(&key, ttl).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::counter::{CounterError, InMemoryCounterStore};
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    struct Harness {
        clock: Arc<ManualClock>,
        counters: Arc<InMemoryCounterStore>,
        controller: AdmissionController,
    }

    fn harness(enable_quota_checking: bool) -> Harness {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()));
        let counters = Arc::new(InMemoryCounterStore::new(clock.clone()));
        let config = RateLimitConfig {
            sliding_window_seconds: 1,
            enable_quota_checking,
        };
        let controller = AdmissionController::new(counters.clone(), clock.clone(), &config);
        Harness { clock, counters, controller }
    }

    fn free_tier() -> TierConfig {
        TierConfig {
            monthly_quota: 1_000,
            requests_per_second: 2,
            monthly_price_usd: dec!(0),
        }
    }

    #[tokio::test]
    async fn test_oversized_window_is_clamped() {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap()));
        let counters = Arc::new(InMemoryCounterStore::new(clock.clone()));
        let tier = free_tier();

        for (customer_id, window) in [(1, 1u64 << 63), (2, u64::MAX)] {
            let config = RateLimitConfig {
                sliding_window_seconds: window,
                enable_quota_checking: true,
            };
            let controller = AdmissionController::new(counters.clone(), clock.clone(), &config);

            assert!(controller.check(customer_id, &tier).await.unwrap().allowed);
            assert!(controller.check(customer_id, &tier).await.unwrap().allowed);

            // Still inside a day-long window
            clock.advance(chrono::Duration::hours(1));
            assert!(!controller.check(customer_id, &tier).await.unwrap().allowed);
        }
    }

    #[tokio::test]
    async fn test_window_denies_over_rps() {
        let h = harness(true);
        let tier = free_tier();

        assert!(h.controller.check(1, &tier).await.unwrap().allowed);
        assert!(h.controller.check(1, &tier).await.unwrap().allowed);

        let denied = h.controller.check(1, &tier).await.unwrap();
        assert!(!denied.allowed);
        assert!(!denied.is_quota_exceeded);
        assert_eq!(denied.retry_after_secs, Some(1));
        assert_eq!(denied.limit, 2);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.reset_at, h.clock.now() + chrono::Duration::seconds(1));
    }

    #[tokio::test]
    async fn test_window_recovers() {
        let h = harness(true);
        let tier = free_tier();

        for _ in 0..3 {
            h.controller.check(1, &tier).await.unwrap();
        }
        h.clock.advance(chrono::Duration::milliseconds(1100));

        assert!(h.controller.check(1, &tier).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_windows_are_per_customer() {
        let h = harness(true);
        let tier = free_tier();

        h.controller.check(1, &tier).await.unwrap();
        h.controller.check(1, &tier).await.unwrap();

        assert!(!h.controller.check(1, &tier).await.unwrap().allowed);
        assert!(h.controller.check(2, &tier).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_allowed_reports_quota_budget() {
        let h = harness(true);
        let decision = h.controller.check(7, &free_tier()).await.unwrap();

        assert!(decision.allowed);
        assert_eq!(decision.retry_after_secs, None);
        assert_eq!(decision.limit, 1_000);
        assert_eq!(decision.remaining, 999);
        assert_eq!(decision.reset_at, Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 59).unwrap());
    }

    #[tokio::test]
    async fn test_check_never_charges_quota() {
        let h = harness(true);
        let tier = free_tier();

        for _ in 0..5 {
            h.controller.check(3, &tier).await.unwrap();
        }
        let key = AdmissionController::quota_key(3, h.clock.now());
        assert_eq!(h.counters.peek_counter(&key), 0);

        h.controller.commit_quota(3).await.unwrap();
        assert_eq!(h.counters.peek_counter(&key), 1);
    }

    #[tokio::test]
    async fn test_quota_exhausted() {
        let h = harness(true);
        let tier = TierConfig {
            monthly_quota: 2,
            requests_per_second: 100,
            monthly_price_usd: dec!(0),
        };

        h.controller.commit_quota(5).await.unwrap();
        h.controller.commit_quota(5).await.unwrap();

        let denied = h.controller.check(5, &tier).await.unwrap();
        let month_end = Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 59).unwrap();
        assert!(!denied.allowed);
        assert!(denied.is_quota_exceeded);
        assert_eq!(denied.limit, 2);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.reset_at, month_end);
        assert_eq!(
            denied.retry_after_secs,
            Some((month_end - h.clock.now()).num_seconds() as u64)
        );
    }

    #[tokio::test]
    async fn test_quota_resets_next_month() {
        let h = harness(true);
        let tier = TierConfig {
            monthly_quota: 1,
            requests_per_second: 100,
            monthly_price_usd: dec!(0),
        };

        h.controller.commit_quota(5).await.unwrap();
        assert!(!h.controller.check(5, &tier).await.unwrap().allowed);

        h.clock.set(Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap());
        assert!(h.controller.check(5, &tier).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_commit_sets_month_end_expiry() {
        let h = harness(true);
        h.controller.commit_quota(9).await.unwrap();

        let key = AdmissionController::quota_key(9, h.clock.now());
        assert_eq!(
            h.counters.expires_at(&key),
            Some(Utc.with_ymd_and_hms(2026, 3, 31, 23, 59, 59).unwrap())
        );
    }

    #[tokio::test]
    async fn test_quota_checking_disabled() {
        let h = harness(false);
        let tier = TierConfig {
            monthly_quota: 1,
            requests_per_second: 100,
            monthly_price_usd: dec!(0),
        };

        h.controller.commit_quota(5).await.unwrap();
        let decision = h.controller.check(5, &tier).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
    }

    #[tokio::test]
    async fn test_store_outage_is_an_error() {
        let h = harness(true);
        h.counters.set_available(false);

        let result = h.controller.check(1, &free_tier()).await;
        assert!(matches!(result, Err(CounterError::Unavailable(_))));
    }

    #[test]
    fn test_keys() {
        let at = Utc.with_ymd_and_hms(2026, 11, 2, 0, 0, 0).unwrap();
        assert_eq!(AdmissionController::window_key(12), "ratelimit:12:second");
        assert_eq!(AdmissionController::quota_key(12, at), "quota:12:2026:11");
    }
}
