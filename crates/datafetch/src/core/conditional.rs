//! Conditional request support.
//!
//! An expired cache entry that still carries an ETag or Last-Modified value
//! is revalidated with `If-None-Match` / `If-Modified-Since` instead of being
//! downloaded again. A `304 Not Modified` answer renews the old body.

use crate::core::cache::CacheEntry;
use crate::data::Headers;

/// Validators captured from a response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validators {
    pub etag:          Option<String>,
    pub last_modified: Option<String>,
}

impl Validators {
    pub fn from_headers(headers: &Headers) -> Self {
        Self {
            etag:          headers.get("etag").cloned(),
            last_modified: headers.get("last-modified").cloned(),
        }
    }

    pub fn from_entry<T>(entry: &CacheEntry<T>) -> Self {
        Self {
            etag:          entry.etag.clone(),
            last_modified: entry.last_modified.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.etag.is_none() && self.last_modified.is_none()
    }

    /// Request headers that ask the server to answer 304 if nothing changed.
    pub fn conditional_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(2);
        if let Some(etag) = &self.etag {
            headers.push(("If-None-Match".to_string(), etag.clone()));
        }
        if let Some(last_modified) = &self.last_modified {
            headers.push(("If-Modified-Since".to_string(), last_modified.clone()));
        }
        headers
    }

    /// Prefer fresh validators from a 304, falling back to the stored ones.
    #[must_use]
    pub fn merge(self, newer: Validators) -> Validators {
        Validators {
            etag:          newer.etag.or(self.etag),
            last_modified: newer.last_modified.or(self.last_modified),
        }
    }
}
