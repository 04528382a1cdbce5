//! In-memory response cache with TTL expiry and LRU eviction.
//!
//! Entries carry the ETag / Last-Modified validators of the response they
//! came from so an expired entry can be revalidated instead of refetched.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::data::KeyParams;

/// A single cached value.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data:          T,
    pub cached_at:     Instant,
    pub ttl:           Duration,
    pub etag:          Option<String>,
    pub last_modified: Option<String>,
}

impl<T> CacheEntry<T> {
    /// Expired once `ttl` has fully elapsed since the entry was stored.
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.cached_at) >= self.ttl
    }

    /// Whether the entry carries anything to revalidate with.
    pub fn has_validators(&self) -> bool {
        self.etag.is_some() || self.last_modified.is_some()
    }
}

/// Inspection shape of a cache entry, without its payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntryInfo {
    /// Unix epoch milliseconds.
    pub cached_at:     i64,
    /// Milliseconds.
    pub ttl:           u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag:          Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

/// Outcome of [`ResponseCache::lookup`].
#[derive(Debug, Clone)]
pub enum Lookup<T> {
    Fresh(T),
    /// The entry had expired. It has been evicted and is handed back so its
    /// validators can drive a conditional request.
    Stale(CacheEntry<T>),
    Miss,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub size:     usize,
    pub max_size: usize,
    pub entries:  Vec<String>,
}

/// Key/value store bounded by `max_size`, expiring entries after their TTL.
///
/// Every read or write of a key stamps it with the next value of a single
/// global counter, so the lowest stamp always marks the least recently used
/// entry.
#[derive(Debug)]
pub struct ResponseCache<T> {
    entries:        HashMap<String, CacheEntry<T>>,
    access_order:   HashMap<String, u64>,
    access_counter: u64,
    max_size:       usize,
    default_ttl:    Duration,
}

impl<T: Clone> ResponseCache<T> {
    /// `max_size` is clamped to a minimum of 1.
    pub fn new(max_size: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            access_order: HashMap::new(),
            access_counter: 0,
            max_size: max_size.max(1),
            default_ttl,
        }
    }

    /// Canonical cache key for a URL and its key parameters.
    ///
    /// The bare URL when there are no parameters, otherwise
    /// `url?k1=<json>&k2=<json>` with keys in lexicographic order.
    pub fn generate_key(url: &str, params: Option<&KeyParams>) -> String {
        match params {
            Some(params) => params.canonical_key(url),
            None => url.to_string(),
        }
    }

    /// Live value for `key`. An expired entry is evicted and reported absent.
    pub fn get(&mut self, key: &str) -> Option<T> {
        match self.lookup(key) {
            Lookup::Fresh(data) => Some(data),
            Lookup::Stale(_) | Lookup::Miss => None,
        }
    }

    /// Like [`get`](Self::get), but hands back the evicted entry when it
    /// had expired.
    pub fn lookup(&mut self, key: &str) -> Lookup<T> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(now),
            None => return Lookup::Miss,
        };

        if expired {
            self.access_order.remove(key);
            return match self.entries.remove(key) {
                Some(entry) => {
                    tracing::debug!(key, "cache entry expired");
                    Lookup::Stale(entry)
                }
                None => Lookup::Miss,
            };
        }

        self.touch(key);
        match self.entries.get(key) {
            Some(entry) => Lookup::Fresh(entry.data.clone()),
            None => Lookup::Miss,
        }
    }

    /// Insert or overwrite `key`, evicting the least recently used entry
    /// first when a new key would exceed capacity.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        data: T,
        ttl: Option<Duration>,
        etag: Option<String>,
        last_modified: Option<String>,
    ) {
        let key = key.into();
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_size {
            self.evict_lru();
        }

        self.entries.insert(
            key.clone(),
            CacheEntry {
                data,
                cached_at: Instant::now(),
                ttl: ttl.unwrap_or(self.default_ttl),
                etag,
                last_modified,
            },
        );
        self.touch(&key);
    }

    /// Presence check with the same expiry side effect as `get`.
    pub fn has(&mut self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn delete(&mut self, key: &str) -> bool {
        self.access_order.remove(key);
        self.entries.remove(key).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.access_order.clear();
        self.access_counter = 0;
    }

    /// Drop every expired entry and return how many were removed.
    pub fn evict_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        let access_order = &mut self.access_order;
        self.entries.retain(|key, entry| {
            let keep = !entry.is_expired(now);
            if !keep {
                access_order.remove(key);
            }
            keep
        });
        let removed = before - self.entries.len();
        if removed > 0 {
            tracing::debug!(removed, "evicted expired cache entries");
        }
        removed
    }

    /// Metadata of a stored entry. Does not count as an access.
    pub fn inspect(&self, key: &str) -> Option<CacheEntryInfo> {
        let entry = self.entries.get(key)?;
        let age = Instant::now().saturating_duration_since(entry.cached_at);
        let age_ms = i64::try_from(age.as_millis()).unwrap_or(i64::MAX);
        Some(CacheEntryInfo {
            cached_at:     chrono::Utc::now().timestamp_millis().saturating_sub(age_ms),
            ttl:           u64::try_from(entry.ttl.as_millis()).unwrap_or(u64::MAX),
            etag:          entry.etag.clone(),
            last_modified: entry.last_modified.clone(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let mut entries: Vec<String> = self.entries.keys().cloned().collect();
        entries.sort();
        CacheStats {
            size: self.entries.len(),
            max_size: self.max_size,
            entries,
        }
    }

    fn touch(&mut self, key: &str) {
        self.access_counter += 1;
        self.access_order.insert(key.to_string(), self.access_counter);
    }

    fn evict_lru(&mut self) {
        let lru_key = self
            .access_order
            .iter()
            .min_by_key(|(_, stamp)| **stamp)
            .map(|(key, _)| key.clone());

        if let Some(key) = lru_key {
            tracing::debug!(key = %key, "evicting least recently used cache entry");
            self.entries.remove(&key);
            self.access_order.remove(&key);
        }
    }
}
