//! Application Settings
//!
//! Configuration types for the price feed, loaded from environment
//! variables.

use std::time::Duration;

use crate::infrastructure::stream::reconnect::ReconnectConfig;

/// Pairs subscribed when `PRICE_FEED_PAIRS` is unset.
const DEFAULT_PAIRS: &str = "BTC/USD,ETH/USD,SOL/USD";

/// Price stream settings.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// HTTP(S) API endpoint; the stream URL is derived from it.
    pub endpoint: String,
    /// Optional caller identity for the auth handshake.
    pub identity: Option<String>,
    /// Pairs the binary subscribes to on startup.
    pub pairs: Vec<String>,
    /// Flat delay between reconnection attempts.
    pub reconnect_delay: Duration,
    /// Maximum reconnection attempts.
    pub max_reconnect_attempts: u32,
}

impl StreamSettings {
    /// Reconnect configuration for the stream client.
    #[must_use]
    pub const fn reconnect_config(&self) -> ReconnectConfig {
        ReconnectConfig::new(self.reconnect_delay, self.max_reconnect_attempts)
    }
}

/// Price cache settings.
#[derive(Debug, Clone)]
pub struct CacheSettings {
    /// How long a cached price stays valid.
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(60),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Price stream settings.
    pub stream: StreamSettings,
    /// Price cache settings.
    pub cache: CacheSettings,
}

impl AppConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `PRICE_FEED_API_URL` is missing or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        let endpoint = std::env::var("PRICE_FEED_API_URL")
            .map_err(|_| ConfigError::MissingEnvVar("PRICE_FEED_API_URL".to_string()))?;

        if endpoint.is_empty() {
            return Err(ConfigError::EmptyValue("PRICE_FEED_API_URL".to_string()));
        }

        let identity = std::env::var("PRICE_FEED_IDENTITY")
            .ok()
            .filter(|v| !v.is_empty());

        let pairs = std::env::var("PRICE_FEED_PAIRS")
            .unwrap_or_else(|_| DEFAULT_PAIRS.to_string());

        let stream = StreamSettings {
            endpoint,
            identity,
            pairs: parse_pairs(&pairs),
            reconnect_delay: parse_env_duration_millis(
                "PRICE_FEED_RECONNECT_DELAY_MS",
                Duration::from_millis(3000),
            ),
            max_reconnect_attempts: parse_env_u32("PRICE_FEED_MAX_RECONNECT_ATTEMPTS", 5),
        };

        let cache = CacheSettings {
            ttl: parse_env_duration_secs("PRICE_FEED_CACHE_TTL_SECS", Duration::from_secs(60)),
        };

        Ok(Self { stream, cache })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
}

fn parse_pairs(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
