//! Gateway Configuration
//!
//! Layered from built-in defaults, an optional file and `GATEWAY__`-prefixed
//! environment variables (`GATEWAY__RATE_LIMITING__SLIDING_WINDOW_SECONDS=2`).

use crate::counter::RedisCounterConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub server: ServerConfig,
    pub redis: RedisConfig,
    pub rate_limiting: RateLimitConfig,
    pub tier_resolver: TierResolverConfig,
    pub internal_api: InternalApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisConfig {
    pub url: String,
    pub connection_timeout_ms: u64,
    pub response_timeout_ms: u64,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: "redis://127.0.0.1:6379/".into(),
            connection_timeout_ms: 5_000,
            response_timeout_ms: 2_000,
        }
    }
}

impl RedisConfig {
    pub fn counter_config(&self) -> RedisCounterConfig {
        RedisCounterConfig {
            url: self.url.clone(),
            connection_timeout: Duration::from_millis(self.connection_timeout_ms),
            response_timeout: Duration::from_millis(self.response_timeout_ms),
        }
    }
}

/// Longest accepted sliding window
pub const MAX_SLIDING_WINDOW_SECONDS: u64 = 86_400;

/// Sliding window and quota settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub sliding_window_seconds: u64,
    pub enable_quota_checking: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            sliding_window_seconds: 1,
            enable_quota_checking: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierResolverConfig {
    pub cache_ttl_secs: u64,
    pub cache_capacity: u64,
}

impl Default for TierResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 120,
            cache_capacity: 100_000,
        }
    }
}

impl TierResolverConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Upstream the gateway proxies admitted requests to
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InternalApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for InternalApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            timeout_secs: 30,
        }
    }
}

impl GatewayConfig {
    /// Load defaults, then `path` if given, then the environment
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(::config::File::with_name(path));
        }
        builder = builder.add_source(
            ::config::Environment::with_prefix("GATEWAY")
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: GatewayConfig = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let window = self.rate_limiting.sliding_window_seconds;
        if window == 0 || window > MAX_SLIDING_WINDOW_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "rate_limiting.sliding_window_seconds must be between 1 and {}",
                MAX_SLIDING_WINDOW_SECONDS
            )));
        }
        if self.tier_resolver.cache_ttl_secs == 0 {
            return Err(ConfigError::Invalid("tier_resolver.cache_ttl_secs must be > 0".into()));
        }
        if self.redis.url.is_empty() {
            return Err(ConfigError::Invalid("redis.url must not be empty".into()));
        }
        if self.internal_api.base_url.is_empty() {
            return Err(ConfigError::Invalid("internal_api.base_url must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.rate_limiting.sliding_window_seconds, 1);
        assert!(config.rate_limiting.enable_quota_checking);
        assert_eq!(config.tier_resolver.cache_ttl(), Duration::from_secs(120));
        assert_eq!(config.internal_api.base_url, "http://localhost:5000");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_zero_window() {
        let mut config = GatewayConfig::default();
        config.rate_limiting.sliding_window_seconds = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_oversized_window() {
        let mut config = GatewayConfig::default();
        config.rate_limiting.sliding_window_seconds = MAX_SLIDING_WINDOW_SECONDS;
        assert!(config.validate().is_ok());

        for window in [MAX_SLIDING_WINDOW_SECONDS + 1, 1 << 63, u64::MAX] {
            config.rate_limiting.sliding_window_seconds = window;
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: GatewayConfig =
            serde_json::from_str(r#"{"rate_limiting": {"enable_quota_checking": false}}"#).unwrap();
        assert!(!config.rate_limiting.enable_quota_checking);
        assert_eq!(config.rate_limiting.sliding_window_seconds, 1);
        assert_eq!(config.redis.response_timeout_ms, 2_000);
    }
}
