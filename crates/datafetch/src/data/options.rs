use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use super::key::KeyParams;

/// Lifecycle of a single `fetch` call.
///
/// ```text
/// Pending ─┬─▶ CacheHit
///          └─▶ RateLimited ─▶ InFlight ─┬─▶ Success
///                   ▲                   ├─▶ Failed
///                   └────── Retry ◀─────┘
/// ```
///
/// `RateLimited` is a suspension, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestPhase {
    #[default]
    Pending,

    /// Served from the cache without touching the network.
    CacheHit,

    /// Waiting for a rate-limit token.
    RateLimited,

    /// Network attempt in progress.
    InFlight,

    /// Retryable failure, backing off before the next attempt.
    Retry,

    Success,

    Failed,
}

impl fmt::Display for RequestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestPhase::Pending => write!(f, "pending"),
            RequestPhase::CacheHit => write!(f, "cache_hit"),
            RequestPhase::RateLimited => write!(f, "rate_limited"),
            RequestPhase::InFlight => write!(f, "in_flight"),
            RequestPhase::Retry => write!(f, "retry"),
            RequestPhase::Success => write!(f, "success"),
            RequestPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Per-request overrides of the client defaults.
///
/// Unset fields fall back to [`ClientConfig`](crate::ClientConfig).
///
/// # Examples
///
/// ```
/// use datafetch::RequestOptions;
/// use std::time::Duration;
///
/// let options = RequestOptions::default()
///     .timeout(Duration::from_secs(5))
///     .retry(1)
///     .param("season", 2023)
///     .header("Accept", "text/csv");
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub timeout: Option<Duration>,

    /// Additional attempts after the first one.
    pub retry: Option<u32>,

    pub cache: Option<bool>,

    pub cache_ttl: Option<Duration>,

    /// Explicit cache key; replaces the key derived from URL and `params`.
    pub cache_key: Option<String>,

    /// Inputs folded into the derived cache key.
    pub params: KeyParams,

    /// Extra headers for this request only.
    pub headers: Arc<[(String, String)]>,
}

impl RequestOptions {
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    #[must_use]
    pub fn cache(mut self, enabled: bool) -> Self {
        self.cache = Some(enabled);
        self
    }

    #[must_use]
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params = self.params.param(name, value);
        self
    }

    /// Add a single header.
    ///
    /// # Examples
    ///
    /// ```
    /// use datafetch::RequestOptions;
    ///
    /// let options = RequestOptions::default()
    ///     .header("Accept", "application/json")
    ///     .header("X-Trace", "1");
    /// assert_eq!(options.headers.len(), 2);
    /// ```
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut headers: Vec<_> = self.headers.iter().cloned().collect();
        headers.push((key.into(), value.into()));
        self.headers = Arc::from(headers);
        self
    }

    /// Replace all per-request headers.
    #[must_use]
    pub fn headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.headers = Arc::from(headers);
        self
    }
}
