//! Error types for datafetch.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Classified failure of a single `fetch` call.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("rate limited by server for {url}")]
    RateLimited {
        url:      String,
        reset_at: Option<DateTime<Utc>>,
    },

    #[error("data not found at {url} (HTTP {status})")]
    DataNotFound { url: String, status: u16 },

    #[error("unexpected HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("failed to decode payload: {0}")]
    Decode(String),
}

impl FetchError {
    /// Only transport-level failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Network { .. } | FetchError::Timeout { .. })
    }

    /// The URL the failure belongs to, when there is one.
    pub fn url(&self) -> Option<&str> {
        match self {
            FetchError::Network { url, .. }
            | FetchError::Timeout { url, .. }
            | FetchError::RateLimited { url, .. }
            | FetchError::DataNotFound { url, .. }
            | FetchError::Status { url, .. } => Some(url),
            FetchError::InvalidUrl(_) | FetchError::Decode(_) => None,
        }
    }
}

/// Failure reported by a [`Transport`](crate::Transport) implementation.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,
}

/// Failure raised by a lifecycle hook. Never aborts a request.
#[derive(Debug, Error)]
#[error("hook `{hook}` failed: {message}")]
pub struct HookError {
    pub hook:    String,
    pub message: String,
}

impl HookError {
    pub fn new(hook: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            hook:    hook.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, FetchError>;
