//! Client configuration.
//!
//! Built once (usually from a TOML file) and handed to
//! [`Client::new`](crate::Client::new); it does not change afterwards.
//!
//! ```toml
//! base_url = "https://data.example.com/releases/"
//! timeout_ms = 30000
//! retry = 3
//! cache = true
//! cache_ttl_ms = 3600000
//!
//! [headers]
//! Accept = "application/octet-stream"
//!
//! [rate_limit]
//! max_requests = 10
//! interval_ms = 1000
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Token bucket parameters: `max_requests` per `interval_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub interval_ms:  u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            interval_ms:  1000,
        }
    }
}

impl RateLimitConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Prefix for relative request paths.
    pub base_url: Option<String>,

    /// Per-attempt network timeout.
    pub timeout_ms: u64,

    /// Additional attempts after the first one for network failures and timeouts.
    pub retry: u32,

    /// Base delay of the exponential backoff between attempts.
    pub retry_backoff_ms: u64,

    /// Upper bound for a single backoff delay.
    pub max_backoff_ms: u64,

    pub cache: bool,

    pub cache_ttl_ms: u64,

    pub cache_max_size: usize,

    /// Sent with every request.
    pub headers: BTreeMap<String, String>,

    pub user_agent: String,

    /// Emit per-attempt lifecycle events.
    pub debug: bool,

    pub rate_limit: RateLimitConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url:         None,
            timeout_ms:       30_000,
            retry:            3,
            retry_backoff_ms: 250,
            max_backoff_ms:   10_000,
            cache:            true,
            cache_ttl_ms:     3_600_000,
            cache_max_size:   100,
            headers:          BTreeMap::new(),
            user_agent:       concat!("datafetch/", env!("CARGO_PKG_VERSION")).to_string(),
            debug:            false,
            rate_limit:       RateLimitConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Semantic checks that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeout_ms must be positive".into()));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.max_requests must be positive".into(),
            ));
        }
        if self.rate_limit.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.interval_ms must be positive".into(),
            ));
        }
        if self.cache_max_size == 0 {
            return Err(ConfigError::Invalid("cache_max_size must be positive".into()));
        }
        if self.retry_backoff_ms > self.max_backoff_ms {
            return Err(ConfigError::Invalid(format!(
                "retry_backoff_ms ({}) exceeds max_backoff_ms ({})",
                self.retry_backoff_ms, self.max_backoff_ms
            )));
        }
        if let Some(base) = &self.base_url {
            url::Url::parse(base)
                .map_err(|e| ConfigError::Invalid(format!("base_url `{base}`: {e}")))?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}
