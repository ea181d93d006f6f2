use std::time::Duration;

use leftwatch_feed::DEFAULT_POLL_INTERVAL;
use url::Url;

/// Backend used when `API_BASE_URL` is not set.
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000";

/// Timeout applied to every backend request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Dashboard configuration loaded from environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardConfig {
    /// Backend base URL without a trailing slash.
    pub api_base_url: String,
    /// Interval between event list refreshes (fixed at 5 s).
    pub poll_interval: Duration,
    /// HTTP request timeout (fixed at 10 s).
    pub request_timeout: Duration,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("API_BASE_URL '{url}' is not a valid URL: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("API_BASE_URL '{url}' must use http or https")]
    UnsupportedScheme { url: String },
}

impl DashboardConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var        | Default                 |
    /// |----------------|-------------------------|
    /// | `API_BASE_URL` | `http://127.0.0.1:8000` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::with_base_url(std::env::var("API_BASE_URL").ok())
    }

    /// Build a configuration from an optional base URL, applying the
    /// same defaults and validation as [`from_env`](Self::from_env).
    pub fn with_base_url(base_url: Option<String>) -> Result<Self, ConfigError> {
        let raw = base_url
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.into());

        let parsed = Url::parse(&raw).map_err(|e| ConfigError::InvalidBaseUrl {
            url: raw.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme { url: raw });
        }

        Ok(Self {
            api_base_url: raw.trim_end_matches('/').to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}
