//! Rate limiting middleware

use crate::constants::headers;
use crate::context::RequestContext;
use crate::error::{GatewayError, GatewayResult};
use crate::ratelimit::{AdmissionController, AdmissionDecision};
use crate::tier::TierResolver;
use axum::http::{HeaderMap, HeaderName, HeaderValue};

/// Resolve the caller's tier and run the admission check.
///
/// Returns the decision whether or not it admits the request; a denial is an
/// expected outcome, not an error. The resolved tier is stored on the context
/// only after the check has run.
pub async fn admit(
    tiers: &TierResolver,
    admission: &AdmissionController,
    ctx: &mut RequestContext,
) -> GatewayResult<AdmissionDecision> {
    let Some(customer_id) = ctx.customer_id else {
        return Err(GatewayError::Internal("admission reached without authentication".into()));
    };

    let Some(tier) = tiers.resolve(customer_id).await? else {
        return Err(GatewayError::Forbidden { customer_id });
    };

    let decision = admission.check(customer_id, &tier).await?;
    ctx.tier = Some(tier);
    Ok(decision)
}

/// Write `X-RateLimit-*` (and `Retry-After` when set) for a decision
pub fn apply_headers(response_headers: &mut HeaderMap, decision: &AdmissionDecision) {
    let remaining = if decision.allowed { decision.remaining } else { 0 };

    response_headers.insert(
        HeaderName::from_static(headers::RATE_LIMIT_LIMIT),
        HeaderValue::from(decision.limit),
    );
    response_headers.insert(
        HeaderName::from_static(headers::RATE_LIMIT_REMAINING),
        HeaderValue::from(remaining),
    );
    response_headers.insert(
        HeaderName::from_static(headers::RATE_LIMIT_RESET),
        HeaderValue::from(decision.reset_at.timestamp()),
    );
    if let Some(retry_after) = decision.retry_after_secs {
        response_headers.insert(
            HeaderName::from_static(headers::RETRY_AFTER),
            HeaderValue::from(retry_after),
        );
    }
}
