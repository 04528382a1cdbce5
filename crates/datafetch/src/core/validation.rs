//! Pure checks on request URLs and response status lines.

use chrono::{DateTime, TimeZone, Utc};
use url::Url;

use crate::data::Headers;
use crate::error::FetchError;

/// Returns `true` for 2xx status codes.
pub fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Returns `true` for `304 Not Modified`.
pub fn is_not_modified(status: u16) -> bool {
    status == 304
}

/// Resolve `url` against an optional base.
///
/// Absolute `http`/`https` URLs are used as given; anything else is treated
/// as a path relative to `base_url`.
///
/// # Examples
///
/// ```
/// use datafetch::resolve_url;
///
/// let url = resolve_url(Some("https://example.com/releases/"), "pbp/2023.csv").unwrap();
/// assert_eq!(url, "https://example.com/releases/pbp/2023.csv");
///
/// assert!(resolve_url(None, "pbp/2023.csv").is_err());
/// ```
pub fn resolve_url(base_url: Option<&str>, url: &str) -> Result<String, FetchError> {
    if let Ok(parsed) = Url::parse(url) {
        return match parsed.scheme() {
            "http" | "https" => Ok(parsed.into()),
            scheme => Err(FetchError::InvalidUrl(format!(
                "unsupported scheme `{scheme}` in {url}"
            ))),
        };
    }

    let Some(base) = base_url else {
        return Err(FetchError::InvalidUrl(format!(
            "relative URL `{url}` without a base_url"
        )));
    };

    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        url.trim_start_matches('/')
    );
    Url::parse(&joined)
        .map(String::from)
        .map_err(|e| FetchError::InvalidUrl(format!("{joined}: {e}")))
}

/// Map a non-success, non-304 status to its error.
///
/// Returns `None` for 2xx and 304.
pub fn classify_status(url: &str, status: u16, headers: &Headers) -> Option<FetchError> {
    if is_success(status) || is_not_modified(status) {
        return None;
    }
    let url = url.to_string();
    Some(match status {
        404 | 410 => FetchError::DataNotFound { url, status },
        429 => FetchError::RateLimited {
            url,
            reset_at: rate_limit_reset(headers, Utc::now()),
        },
        _ => FetchError::Status { url, status },
    })
}

/// When a server-side rate limit lifts, from `Retry-After` (seconds or an
/// HTTP date) or `X-RateLimit-Reset` (epoch seconds).
pub fn rate_limit_reset(headers: &Headers, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    if let Some(value) = headers.get("retry-after").map(|v| v.trim()) {
        if let Ok(seconds) = value.parse::<i64>() {
            return now.checked_add_signed(chrono::Duration::seconds(seconds));
        }
        if let Ok(date) = DateTime::parse_from_rfc2822(value) {
            return Some(date.with_timezone(&Utc));
        }
    }

    headers
        .get("x-ratelimit-reset")
        .and_then(|v| v.trim().parse::<i64>().ok())
        .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single())
}
