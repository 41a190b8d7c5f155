//! Usage logging middleware

use crate::context::RequestContext;
use crate::usage::{CompletedCall, UsageRecorder};
use axum::http::StatusCode;

/// Record a finished call if it was authenticated and succeeded.
///
/// Failures are logged and swallowed: the response is already decided and
/// must not change because bookkeeping failed.
pub async fn record_usage(
    recorder: &UsageRecorder,
    ctx: &RequestContext,
    method: &str,
    endpoint: &str,
    status: StatusCode,
) {
    let Some(customer_id) = ctx.customer_id else {
        return;
    };
    if !status.is_success() {
        return;
    }

    let call = CompletedCall {
        customer_id,
        user_id: ctx.user_id.as_deref(),
        endpoint,
        method,
        status: status.as_u16(),
    };
    if let Err(err) = recorder.record(call).await {
        tracing::error!(customer_id, endpoint, error = %err, "Usage logging failed");
    }
}
