//! KYC provider client configuration.
//!
//! Configures base URLs for the artifact storage service and the
//! verification oracle. Defaults point to production endpoints. Override
//! via environment variables or explicit construction for staging/testing.

use url::Url;
use zeroize::Zeroizing;

/// Configuration for connecting to the KYC provider services.
///
/// Custom `Debug` implementation redacts the `api_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL for the artifact storage service.
    /// Default: <https://storage.api.loka.rent>
    pub storage_url: Url,
    /// Base URL for the verification oracle.
    /// Default: <https://verify.api.loka.rent>
    pub oracle_url: Url,
    /// Bearer token for API authentication. Held in a zeroizing buffer so
    /// the secret is wiped when the config is dropped.
    pub api_token: Zeroizing<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("storage_url", &self.storage_url)
            .field("oracle_url", &self.oracle_url)
            .field("api_token", &"[REDACTED]")
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `LKYC_STORAGE_URL` (default: `https://storage.api.loka.rent`)
    /// - `LKYC_ORACLE_URL` (default: `https://verify.api.loka.rent`)
    /// - `LKYC_API_TOKEN` (required)
    /// - `LKYC_HTTP_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = std::env::var("LKYC_API_TOKEN").map_err(|_| ConfigError::MissingToken)?;

        Ok(Self {
            storage_url: env_url("LKYC_STORAGE_URL", "https://storage.api.loka.rent")?,
            oracle_url: env_url("LKYC_ORACLE_URL", "https://verify.api.loka.rent")?,
            api_token: Zeroizing::new(api_token),
            timeout_secs: std::env::var("LKYC_HTTP_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
        })
    }

    /// Create a configuration pointing to local mock servers (for
    /// testing). The oracle gets `base_port + 1`.
    pub fn local_mock(base_port: u16, token: &str) -> Result<Self, ConfigError> {
        let make_url = |port: u16| -> Result<Url, ConfigError> {
            Url::parse(&format!("http://127.0.0.1:{port}"))
                .map_err(|e| ConfigError::InvalidUrl("localhost".to_string(), e.to_string()))
        };
        Ok(Self {
            storage_url: make_url(base_port)?,
            oracle_url: make_url(base_port + 1)?,
            api_token: Zeroizing::new(token.to_string()),
            timeout_secs: 5,
        })
    }
}

fn env_url(var: &str, default: &str) -> Result<Url, ConfigError> {
    let raw = std::env::var(var).unwrap_or_else(|_| default.to_string());
    Url::parse(&raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("LKYC_API_TOKEN environment variable is required")]
    MissingToken,
    #[error("API token contains characters not allowed in an HTTP header")]
    InvalidToken,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
}
