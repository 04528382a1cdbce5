use std::collections::BTreeMap;

use bytes::Bytes;

/// Response headers keyed by lower-cased name.
pub type Headers = BTreeMap<String, String>;

/// What a caller gets back from [`Client::fetch`](crate::Client::fetch).
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResponse {
    pub data:       Bytes,
    pub status:     u16,
    pub headers:    Headers,
    pub from_cache: bool,
    /// The resolved URL that was requested.
    pub url:        String,
}

impl FetchResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn etag(&self) -> Option<&str> {
        self.header("etag")
    }

    pub fn last_modified(&self) -> Option<&str> {
        self.header("last-modified")
    }
}

/// The part of a response kept in the cache.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub data:    Bytes,
    pub status:  u16,
    pub headers: Headers,
}

impl CachedResponse {
    pub fn into_response(self, url: impl Into<String>, status: u16) -> FetchResponse {
        FetchResponse {
            data: self.data,
            status,
            headers: self.headers,
            from_cache: true,
            url: url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_ignores_case() {
        let mut headers = Headers::new();
        headers.insert("etag".into(), "\"v2\"".into());
        headers.insert("last-modified".into(), "Tue, 01 Oct 2024 00:00:00 GMT".into());

        let response = CachedResponse {
            data: Bytes::from_static(b"season,team\n2023,KC\n"),
            status: 200,
            headers,
        }
        .into_response("https://example.com/x.csv", 200);

        assert!(response.from_cache);
        assert_eq!(response.header("ETag"), Some("\"v2\""));
        assert_eq!(response.etag(), Some("\"v2\""));
        assert_eq!(response.last_modified(), Some("Tue, 01 Oct 2024 00:00:00 GMT"));
        assert_eq!(response.header("content-type"), None);
    }
}
