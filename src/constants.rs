//! Header names, error codes and well-known paths

/// HTTP header names
pub mod headers {
    pub const API_KEY: &str = "x-api-key";
    pub const USER_ID: &str = "x-user-id";
    pub const RETRY_AFTER: &str = "retry-after";
    pub const RATE_LIMIT_LIMIT: &str = "x-ratelimit-limit";
    pub const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";
    pub const RATE_LIMIT_RESET: &str = "x-ratelimit-reset";
}

/// Machine-readable error codes returned in JSON bodies
pub mod error_codes {
    pub const MISSING_API_KEY: &str = "MISSING_API_KEY";
    pub const INVALID_API_KEY: &str = "INVALID_API_KEY";
    pub const TIER_NOT_FOUND: &str = "TIER_NOT_FOUND";
    pub const RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";
    pub const QUOTA_EXCEEDED: &str = "QUOTA_EXCEEDED";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
    pub const RATE_LIMIT_UNAVAILABLE: &str = "RATE_LIMIT_UNAVAILABLE";
    pub const SERVICE_UNAVAILABLE: &str = "SERVICE_UNAVAILABLE";
}

/// Routes the gateway answers itself
pub mod paths {
    pub const HEALTH: &str = "/health";
    pub const INTERNAL_STUB: &str = "/internal/stub";
}

/// Counter store key prefixes
pub mod keys {
    pub const RATE_LIMIT_PREFIX: &str = "ratelimit:";
    pub const QUOTA_PREFIX: &str = "quota:";
}
