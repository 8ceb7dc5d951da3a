//! Client configuration
//!
//! Configuration is read once at startup, from the environment (with `.env`
//! support) or from a JSON document, and validated before the client is
//! built.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};
use crate::http::retry::RetryConfig;
use crate::http::timeout::TimeoutConfig;

/// Environment variable holding the API base URL
pub const API_URL_ENV: &str = "COURIER_API_URL";
/// Environment variable toggling response body logging
pub const DEBUG_RESPONSES_ENV: &str = "COURIER_DEBUG_RESPONSES";

/// Backoff unit used for `read` retries
pub const READ_RETRY_SCALING: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL prefixed to every request path
    pub api_url: String,

    /// Per-verb deadlines
    pub timeouts: TimeoutConfig,

    /// Retry policy for `read`; writes are never retried
    pub read_retry: RetryConfig,

    /// Hosts that receive the bearer token. Empty means the host of
    /// `api_url` only.
    pub allowed_domains: Vec<String>,

    /// Log response bodies (redacted) at debug level
    pub debug_responses: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            timeouts: TimeoutConfig::default(),
            read_retry: RetryConfig::default().with_scaling_duration(READ_RETRY_SCALING),
            allowed_domains: Vec::new(),
            debug_responses: cfg!(debug_assertions),
        }
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Default::default()
        }
    }

    /// Load from the process environment, reading `.env` first if present
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let api_url = std::env::var(API_URL_ENV).map_err(|e| Error::Configuration {
            message: format!("{} is not set", API_URL_ENV),
            source: Some(Box::new(e)),
        })?;

        let mut config = Self::new(api_url);
        if let Ok(value) = std::env::var(DEBUG_RESPONSES_ENV) {
            config.debug_responses = value.eq_ignore_ascii_case("true") || value == "1";
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::Configuration {
            message: format!("Invalid configuration document: {}", e),
            source: Some(Box::new(e)),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.api_url).map_err(|e| Error::Configuration {
            message: format!("Invalid api_url: {:?}", self.api_url),
            source: Some(Box::new(e)),
        })?;
        if url.host_str().is_none() {
            return Err(Error::configuration(format!("api_url has no host: {}", self.api_url)));
        }
        self.timeouts.validate()
    }

    /// Hosts the auth interceptor may send the token to
    pub fn allowed_hosts(&self) -> Vec<String> {
        if !self.allowed_domains.is_empty() {
            return self.allowed_domains.clone();
        }
        Url::parse(&self.api_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .into_iter()
            .collect()
    }
}
