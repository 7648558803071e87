//! Shared HTTP client utilities

use crate::{EgressError, Result};
use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds, covering the whole upstream round trip
    pub timeout_secs: u64,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,

    /// Maximum number of idle connections per host
    pub pool_max_idle_per_host: usize,

    /// User agent string, sent only when the live request carries none
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            connect_timeout_secs: 10,
            pool_max_idle_per_host: 8,
            user_agent: format!("Tapedeck/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Create the client used for recording
///
/// Automatic decompression is disabled: the recorder must capture the exact
/// bytes upstream sent, and the sanitizer decodes them afterwards.
pub fn create_client(config: &HttpClientConfig) -> Result<Client> {
    ClientBuilder::new()
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .pool_max_idle_per_host(config.pool_max_idle_per_host)
        .pool_idle_timeout(Duration::from_secs(90))
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .no_gzip()
        .no_brotli()
        .no_deflate()
        .build()
        .map_err(|e| EgressError::ConfigError(format!("Failed to create HTTP client: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.timeout_secs, 600);
        assert_eq!(config.connect_timeout_secs, 10);
        assert!(config.user_agent.starts_with("Tapedeck/"));
    }

    #[test]
    fn test_create_client() {
        assert!(create_client(&HttpClientConfig::default()).is_ok());
    }
}
