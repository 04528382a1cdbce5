//! Self-contained building blocks of the request layer.
//!
//! Admission control and the response cache own their state but perform no
//! I/O; the rest are pure functions over statuses, URLs and headers.

pub mod cache;
pub mod conditional;
pub mod decode;
pub mod rate_limit;
mod retry;
mod validation;

pub use cache::{CacheEntry, CacheEntryInfo, CacheStats, Lookup, ResponseCache};
pub use conditional::Validators;
pub use decode::{Decoder, JsonDecoder};
pub use rate_limit::{RateLimiter, RateLimiterStats};
pub use retry::{backoff_delay, retry_delay};
pub use validation::{classify_status, is_not_modified, is_success, rate_limit_reset, resolve_url};
