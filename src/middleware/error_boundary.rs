//! Error boundary
//!
//! The only place a [`GatewayError`] becomes an HTTP response. The match is
//! exhaustive so a new error kind cannot silently fall through to a 500.
//! Errors are values raised before a response exists, so a response that has
//! already been produced is never replaced.

use crate::constants::error_codes;
use crate::error::{AuthFailure, GatewayError, UnavailableKind};
use crate::middleware::rate_limit::apply_headers;
use crate::models::{ErrorBody, RateLimitedBody};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use std::any::Any;

fn error_response(status: StatusCode, message: &str, code: &str) -> Response {
    (status, Json(ErrorBody::new(message, code))).into_response()
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match &self {
            GatewayError::Unavailable { .. } | GatewayError::Internal(_) => {
                tracing::error!(error = %self, details = ?self, "Unhandled gateway error");
            }
            GatewayError::Unauthenticated(_) | GatewayError::Forbidden { .. } | GatewayError::RateLimited(_) => {
                tracing::debug!(error = %self, "Request denied");
            }
        }

        match self {
            GatewayError::Unauthenticated(AuthFailure::MissingCredential) => error_response(
                StatusCode::UNAUTHORIZED,
                "Missing or invalid API key.",
                error_codes::MISSING_API_KEY,
            ),
            GatewayError::Unauthenticated(AuthFailure::InvalidCredential) => error_response(
                StatusCode::UNAUTHORIZED,
                "Invalid API key.",
                error_codes::INVALID_API_KEY,
            ),
            GatewayError::Forbidden { .. } => error_response(
                StatusCode::FORBIDDEN,
                "Tier not found.",
                error_codes::TIER_NOT_FOUND,
            ),
            GatewayError::RateLimited(decision) => {
                let (message, code) = if decision.is_quota_exceeded {
                    ("Monthly quota exceeded.", error_codes::QUOTA_EXCEEDED)
                } else {
                    ("Too many requests.", error_codes::RATE_LIMIT_EXCEEDED)
                };
                let body = RateLimitedBody {
                    error: message.to_string(),
                    code: code.to_string(),
                    limit: decision.limit,
                    remaining: 0,
                    reset_at: decision.reset_at,
                    retry_after: decision.retry_after_secs,
                };

                let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(body)).into_response();
                apply_headers(response.headers_mut(), &decision);
                response
            }
            GatewayError::Unavailable { kind: UnavailableKind::RateLimitStore, .. } => error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Rate limit service unavailable.",
                error_codes::RATE_LIMIT_UNAVAILABLE,
            ),
            GatewayError::Unavailable { kind: UnavailableKind::Persistence, .. } => error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                "Service temporarily unavailable.",
                error_codes::SERVICE_UNAVAILABLE,
            ),
            GatewayError::Internal(_) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "An error occurred.",
                error_codes::INTERNAL_ERROR,
            ),
        }
    }
}

/// Response for a panicking handler, used with `CatchPanicLayer::custom`
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };

    GatewayError::Internal(format!("handler panicked: {}", detail)).into_response()
}
