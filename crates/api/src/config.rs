//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use clients::BackendConfig;
use resilience::{CircuitBreakerConfig, RetryConfig};

/// Gateway configuration with defaults for local development.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default `0.0.0.0`)
/// - `PORT`: listen port (default `8080`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LIBRARY_SYSTEM_URL`, `RESERVATION_SYSTEM_URL`, `RATING_SYSTEM_URL`:
///   backend base URLs
/// - `HTTP_TIMEOUT_MS`: per-call timeout for backend requests (default 4000)
/// - `HTTP_MAX_IDLE_PER_HOST`: pooled idle connections per backend (default 100)
/// - `CIRCUIT_BREAKER_MAX_FAILURES`: failures before a breaker opens (default 5)
/// - `CIRCUIT_BREAKER_RESET_TIMEOUT_MS`: open-state cooldown (default 10000)
/// - `RETRY_COOLDOWN_MS`: delay before a deferred request is replayed (default 2000,
///   must be non-zero)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub backends: BackendConfig,
    pub breaker: CircuitBreakerConfig,
    pub retry: RetryConfig,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    ///
    /// Values that fail to parse are ignored with a warning, so install the
    /// subscriber (see [`Config::log_filter`]) before calling this.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT").unwrap_or(defaults.port),
            log_level: Self::log_filter(),
            backends: BackendConfig {
                library_url: std::env::var("LIBRARY_SYSTEM_URL")
                    .unwrap_or(defaults.backends.library_url),
                reservation_url: std::env::var("RESERVATION_SYSTEM_URL")
                    .unwrap_or(defaults.backends.reservation_url),
                rating_url: std::env::var("RATING_SYSTEM_URL")
                    .unwrap_or(defaults.backends.rating_url),
                timeout: millis("HTTP_TIMEOUT_MS").unwrap_or(defaults.backends.timeout),
                max_idle_per_host: parsed("HTTP_MAX_IDLE_PER_HOST")
                    .unwrap_or(defaults.backends.max_idle_per_host),
            },
            breaker: CircuitBreakerConfig {
                max_failures: parsed("CIRCUIT_BREAKER_MAX_FAILURES")
                    .unwrap_or(defaults.breaker.max_failures),
                reset_timeout: millis("CIRCUIT_BREAKER_RESET_TIMEOUT_MS")
                    .unwrap_or(defaults.breaker.reset_timeout),
            },
            retry: RetryConfig {
                cooldown: nonzero_millis("RETRY_COOLDOWN_MS")
                    .unwrap_or(defaults.retry.cooldown),
            },
        }
    }

    /// Returns the tracing filter directive from `RUST_LOG`, or `info`.
    pub fn log_filter() -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string())
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            log_level: "info".to_string(),
            backends: BackendConfig::default(),
            breaker: CircuitBreakerConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable configuration value");
            None
        }
    }
}

fn millis(key: &str) -> Option<Duration> {
    parsed::<u64>(key).map(Duration::from_millis)
}

fn nonzero_millis(key: &str) -> Option<Duration> {
    let value = millis(key)?;
    if value.is_zero() {
        tracing::warn!(key, "ignoring zero duration");
        return None;
    }
    Some(value)
}
