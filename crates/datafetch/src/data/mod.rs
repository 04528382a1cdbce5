//! Immutable data types for request orchestration.
//!
//! Configuration, per-request overrides, cache-key inputs and the response
//! shape handed back to callers. Nothing in here performs I/O apart from
//! [`ClientConfig::load`].

pub mod config;
pub mod key;
pub mod options;
pub mod response;

pub use config::{ClientConfig, RateLimitConfig};
pub use key::KeyParams;
pub use options::{RequestOptions, RequestPhase};
pub use response::{CachedResponse, FetchResponse, Headers};
