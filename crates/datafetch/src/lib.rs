//! Rate-limited, cached and retried fetching of remote data files.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - `data` - Immutable configuration, request options and response types
//! - `core` - Admission control, the response cache and pure helpers
//! - `effects` - Network transport, hooks and the [`Client`] orchestrator
//!
//! # Key Features
//!
//! - **Admission Control**: A token bucket with FIFO waiters gates every network attempt
//! - **Response Cache**: TTL expiry plus least-recently-used eviction, with ETag revalidation
//! - **Bounded Retry**: Exponential backoff for network failures and timeouts only
//! - **Classified Errors**: Not-found, server rate limits and timeouts are distinct variants
//!
//! # Example
//!
//! ```no_run
//! use datafetch::{Client, ClientConfig, RequestOptions};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig {
//!     base_url: Some("https://data.example.com/releases/".into()),
//!     ..ClientConfig::default()
//! };
//! let client = Client::with_reqwest(config)?;
//!
//! let options = RequestOptions::default().param("season", 2023);
//! let response = client.fetch("pbp/play_by_play_2023.csv", &options).await?;
//! println!("{} bytes, cached: {}", response.data.len(), response.from_cache);
//! # Ok(())
//! # }
//! ```

mod core;
mod data;
mod effects;
mod error;

pub use crate::core::{
    CacheEntry, CacheEntryInfo, CacheStats, Decoder, JsonDecoder, Lookup, RateLimiter,
    RateLimiterStats, ResponseCache, Validators, backoff_delay, classify_status, is_not_modified,
    is_success, rate_limit_reset, resolve_url, retry_delay,
};
pub use data::{
    CachedResponse, ClientConfig, FetchResponse, Headers, KeyParams, RateLimitConfig,
    RequestOptions, RequestPhase,
};
pub use effects::{
    Client, FetchHook, Hooks, TracingHook, Transport, TransportRequest, TransportResponse,
};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestTransport;

pub use error::{ConfigError, FetchError, HookError, Result, TransportError};
