//! Authentication middleware

use crate::constants::{headers, paths};
use crate::context::RequestContext;
use crate::error::{AuthFailure, GatewayError, GatewayResult};
use crate::store::CustomerStore;
use axum::http::HeaderMap;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of an API key. Only this hash is ever stored.
pub fn hash_api_key(api_key: impl AsRef<[u8]>) -> String {
    hex::encode(Sha256::digest(api_key.as_ref()))
}

/// Whether `path` is the health endpoint.
///
/// Exact, case-sensitive match. Unlike a segment-prefix match, `/HEALTH`
/// and `/health/ready` are not health paths: they fall through to the
/// upstream proxy and must be authenticated.
pub fn is_health_path(path: &str) -> bool {
    path == paths::HEALTH
}

/// Resolve the `X-Api-Key` header to a customer and record it, together with
/// the optional `X-User-Id`, on the request context.
pub async fn authenticate(
    customers: &dyn CustomerStore,
    ctx: &mut RequestContext,
    request_headers: &HeaderMap,
) -> GatewayResult<()> {
    let api_key = request_headers
        .get(headers::API_KEY)
        .map(|v| v.as_bytes())
        .filter(|v| !v.is_empty());

    let Some(api_key) = api_key else {
        tracing::warn!("Request rejected: missing API key");
        return Err(GatewayError::Unauthenticated(AuthFailure::MissingCredential));
    };

    let Some(customer) = customers.find_by_api_key_hash(&hash_api_key(api_key)).await? else {
        tracing::warn!("Request rejected: invalid API key");
        return Err(GatewayError::Unauthenticated(AuthFailure::InvalidCredential));
    };

    ctx.customer_id = Some(customer.id);
    ctx.user_id = request_headers
        .get(headers::USER_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    Ok(())
}
