//! Per-request gateway state
//!
//! One [`RequestContext`] is created for every inbound request and passed by
//! reference through the pipeline stages. Authentication fills in the
//! customer, admission fills in the tier, usage recording reads both.

use crate::models::{CustomerId, TierConfig};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Customer owning the presented API key
    pub customer_id: Option<CustomerId>,
    /// Caller-supplied `X-User-Id`, kept for usage attribution only
    pub user_id: Option<String>,
    /// Set once the admission check has run
    pub tier: Option<TierConfig>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_authenticated(&self) -> bool {
        self.customer_id.is_some()
    }
}
