//! Backend endpoints and HTTP client settings.

use std::time::Duration;

/// Per-call timeout applied to every outbound request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

/// Idle connections kept per backend host.
pub const DEFAULT_MAX_IDLE_PER_HOST: usize = 100;

/// Where the backend services live and how to talk to them.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub library_url: String,
    pub reservation_url: String,
    pub rating_url: String,
    pub timeout: Duration,
    pub max_idle_per_host: usize,
}

impl BackendConfig {
    /// Builds the shared reqwest client for all three services.
    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.max_idle_per_host)
            .build()
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            library_url: "http://localhost:8060".to_string(),
            reservation_url: "http://localhost:8070".to_string(),
            rating_url: "http://localhost:8050".to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_idle_per_host: DEFAULT_MAX_IDLE_PER_HOST,
        }
    }
}
