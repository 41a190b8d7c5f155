//! Usage Recording
//!
//! Persists a [`UsageFact`] for a successful call and then charges the
//! monthly quota. The two steps are independent: if the fact is written and
//! the quota commit fails, the call is logged but not charged.

use crate::clock::Clock;
use crate::error::GatewayResult;
use crate::models::{CustomerId, UsageFact};
use crate::ratelimit::AdmissionController;
use crate::store::UsageSink;
use std::sync::Arc;

/// A completed call, before it is stamped and persisted
#[derive(Debug, Clone)]
pub struct CompletedCall<'a> {
    pub customer_id: CustomerId,
    pub user_id: Option<&'a str>,
    pub endpoint: &'a str,
    pub method: &'a str,
    pub status: u16,
}

/// Records usage and commits quota for successful calls
pub struct UsageRecorder {
    sink: Arc<dyn UsageSink>,
    admission: Arc<AdmissionController>,
    clock: Arc<dyn Clock>,
}

impl UsageRecorder {
    pub fn new(sink: Arc<dyn UsageSink>, admission: Arc<AdmissionController>, clock: Arc<dyn Clock>) -> Self {
        Self { sink, admission, clock }
    }

    /// Persist the fact, then commit quota.
    ///
    /// # Errors
    /// Returns the first failing step. Nothing is retried.
    pub async fn record(&self, call: CompletedCall<'_>) -> GatewayResult<()> {
        let fact = UsageFact {
            customer_id: call.customer_id,
            user_id: call.user_id.map(str::to_string),
            endpoint: call.endpoint.to_string(),
            method: call.method.to_string(),
            timestamp: self.clock.now(),
            response_status: call.status,
        };

        self.sink.append(fact).await?;
        self.admission.commit_quota(call.customer_id).await?;

        tracing::debug!(customer_id = call.customer_id, endpoint = call.endpoint, "Usage logged");
        Ok(())
    }
}
