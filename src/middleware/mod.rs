//! Admission pipeline
//!
//! ```text
//! ErrorBoundary → Authenticate → Admit → handler → RecordUsage
//! ```
//!
//! Each request gets its own [`RequestContext`], passed by reference from
//! stage to stage. Every store call runs inside the request future, so when
//! the client disconnects and the future is dropped, in-flight counter and
//! persistence operations are cancelled with it.

pub mod auth;
pub mod error_boundary;
pub mod rate_limit;
pub mod usage;

use crate::context::RequestContext;
use crate::error::{GatewayError, GatewayResult};
use crate::GatewayState;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

/// Gateway middleware, mounted with `axum::middleware::from_fn_with_state`
pub async fn gateway_pipeline(State(state): State<GatewayState>, request: Request, next: Next) -> Response {
    if auth::is_health_path(request.uri().path()) {
        return next.run(request).await;
    }

    let mut ctx = RequestContext::new();
    match run(&state, &mut ctx, request, next).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

async fn run(
    state: &GatewayState,
    ctx: &mut RequestContext,
    mut request: Request,
    next: Next,
) -> GatewayResult<Response> {
    auth::authenticate(state.customers.as_ref(), ctx, request.headers()).await?;

    let decision = rate_limit::admit(&state.tiers, &state.admission, ctx).await?;
    if !decision.allowed {
        return Err(GatewayError::RateLimited(decision));
    }

    let method = request.method().as_str().to_string();
    let endpoint = request.uri().path().to_string();
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    rate_limit::apply_headers(response.headers_mut(), &decision);

    usage::record_usage(&state.usage, ctx, &method, &endpoint, response.status()).await;
    Ok(response)
}
