//! Connection settings for the analysis service.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::gateway::GatewayError;

/// Backend used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Path prefix every endpoint lives under.
pub const API_PREFIX: &str = "/api/v1";

/// The backend may itself wait on a slow AI service.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variable overriding the base URL.
pub const BASE_URL_ENV: &str = "RISKFLOW_API_BASE_URL";

/// Environment variable overriding the timeout (e.g. `90s`, `2m`).
pub const TIMEOUT_ENV: &str = "RISKFLOW_TIMEOUT";

/// Settings for a gateway client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Service origin, with or without the `/api/v1` suffix
    pub base_url: String,

    /// Fixed per-request timeout
    #[serde(with = "duration_human")]
    pub timeout: Duration,
}

mod duration_human {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    /// Create a config for `base_url` with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Read overrides from `RISKFLOW_API_BASE_URL` and `RISKFLOW_TIMEOUT`.
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`GatewayConfig::from_env`], with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, GatewayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }

        if let Some(raw) = lookup(TIMEOUT_ENV).filter(|v| !v.trim().is_empty()) {
            config.timeout = humantime::parse_duration(raw.trim()).map_err(|e| {
                GatewayError::NotConfigured(format!("{TIMEOUT_ENV}='{raw}' is not a duration: {e}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Set custom base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set custom timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Base URL including the `/api/v1` prefix, without a trailing slash.
    pub fn api_root(&self) -> String {
        let trimmed = self.base_url.trim().trim_end_matches('/');
        if trimmed.ends_with(API_PREFIX) {
            trimmed.to_string()
        } else {
            format!("{trimmed}{API_PREFIX}")
        }
    }

    /// Full URL of an endpoint path such as `/static-scan`.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_root(), path.trim_start_matches('/'))
    }

    pub fn validate(&self) -> Result<(), GatewayError> {
        let url = self.base_url.trim();
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(GatewayError::NotConfigured(
                "base_url must start with http:// or https://".to_string(),
            ));
        }
        if self.timeout.is_zero() {
            return Err(GatewayError::NotConfigured(
                "timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
