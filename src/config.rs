//! Endpoint configuration for the Konto core API.
//!
//! The base URL points at the core's auth mount (it may carry a path prefix,
//! `https://konto.example.com/api/auth`); endpoint paths are appended to it.
//! Storage upload URLs are not derived from this configuration, they arrive
//! verbatim inside upload slots.

use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// User agent sent on every request to the core.
pub static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Time allowed to establish a TCP connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Time allowed for a whole request, body included.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const CORE_URL_ENV: &str = "KONTO_CORE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("KONTO_CORE_URL is not set")]
    MissingCoreUrl,

    #[error("invalid core URL: {0}")]
    InvalidCoreUrl(String),
}

/// Connection settings shared by the auth client and the avatar uploader.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pub base_url: String,
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl CoreConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            user_agent: APP_USER_AGENT.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Read the base URL from `KONTO_CORE_URL`.
    ///
    /// # Errors
    ///
    /// Returns an error if the variable is unset or blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        env::var(CORE_URL_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .map(Self::new)
            .ok_or(ConfigError::MissingCoreUrl)
    }

    /// Compose a full endpoint URL from the base URL and `path`.
    ///
    /// The scheme, host and port are normalized, a path prefix on the base
    /// URL is preserved and `path` is appended to it.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL cannot be parsed or has no host.
    pub fn endpoint_url(&self, path: &str) -> Result<String, ConfigError> {
        debug_assert!(path.starts_with('/'), "endpoint path must start with '/'");

        let url = Url::parse(&self.base_url)
            .map_err(|err| ConfigError::InvalidCoreUrl(err.to_string()))?;

        let scheme = url.scheme();

        let host = url
            .host()
            .ok_or_else(|| ConfigError::InvalidCoreUrl("missing host".to_string()))?;

        let port = url
            .port()
            .map_or_else(|| if scheme == "https" { 443 } else { 80 }, |port| port);

        let prefix = url.path().trim_end_matches('/');

        Ok(format!("{scheme}://{host}:{port}{prefix}{path}"))
    }
}
