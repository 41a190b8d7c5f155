//! Error types for the monetization gateway
//!
//! [`GatewayError`] is the closed set of failures a request can end in. It is
//! rendered into an HTTP response in exactly one place, the error boundary in
//! [`crate::middleware::error_boundary`].

use crate::counter::CounterError;
use crate::models::CustomerId;
use crate::ratelimit::AdmissionDecision;
use crate::store::StoreError;
use std::fmt;
use thiserror::Error;

/// Why authentication failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingCredential,
    InvalidCredential,
}

impl fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredential => f.write_str("missing API key"),
            Self::InvalidCredential => f.write_str("invalid API key"),
        }
    }
}

/// Which backing service could not be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnavailableKind {
    /// Counter store used for rate limiting and quotas
    RateLimitStore,
    /// Durable customer/usage store
    Persistence,
}

impl fmt::Display for UnavailableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimitStore => f.write_str("rate limit store"),
            Self::Persistence => f.write_str("persistence"),
        }
    }
}

/// Gateway error type
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Missing or unknown API key (401)
    #[error("unauthenticated: {0}")]
    Unauthenticated(AuthFailure),

    /// Caller is known but its tier cannot be resolved (403)
    #[error("tier not found for customer {customer_id}")]
    Forbidden { customer_id: CustomerId },

    /// Per-second window or monthly quota exhausted (429)
    #[error("rate limited (quota exceeded: {})", .0.is_quota_exceeded)]
    RateLimited(AdmissionDecision),

    /// A backing store is unreachable (503)
    #[error("{kind} unavailable: {detail}")]
    Unavailable { kind: UnavailableKind, detail: String },

    /// Anything else (500)
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<CounterError> for GatewayError {
    fn from(err: CounterError) -> Self {
        GatewayError::Unavailable {
            kind: UnavailableKind::RateLimitStore,
            detail: err.to_string(),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Write(_) => GatewayError::Unavailable {
                kind: UnavailableKind::Persistence,
                detail: err.to_string(),
            },
            StoreError::NotFound(_) | StoreError::Conflict(_) | StoreError::Read(_) => {
                GatewayError::Internal(err.to_string())
            }
        }
    }
}

/// Result type for the gateway
pub type GatewayResult<T> = Result<T, GatewayError>;
