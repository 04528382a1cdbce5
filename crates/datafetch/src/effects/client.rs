use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::core::{
    CacheEntry, CacheEntryInfo, CacheStats, Decoder, Lookup, RateLimiter, RateLimiterStats,
    ResponseCache, Validators, backoff_delay, classify_status, is_not_modified, resolve_url,
};
use crate::data::{
    CachedResponse, ClientConfig, FetchResponse, RequestOptions, RequestPhase,
};
use crate::effects::hooks::{FetchHook, Hooks};
use crate::effects::transport::{Transport, TransportRequest, TransportResponse};
use crate::error::{FetchError, Result, TransportError};

/// Effective parameters of one request: client defaults overlaid with the
/// per-request options.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestPlan {
    url:       String,
    timeout:   Duration,
    retry:     u32,
    cache:     bool,
    ttl:       Duration,
    cache_key: String,
}

/// Cached, rate-limited, retrying HTTP client.
///
/// Owns one response cache and one rate limiter for its whole lifetime.
/// Share it between tasks behind an `Arc`.
pub struct Client<T: Transport> {
    transport: T,
    config:    ClientConfig,
    cache:     Mutex<ResponseCache<CachedResponse>>,
    limiter:   RateLimiter,
    hooks:     Hooks,
}

impl<T: Transport> Client<T> {
    /// Create a client with the provided transport and configuration.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        let cache = ResponseCache::new(config.cache_max_size, config.cache_ttl());
        let limiter = RateLimiter::from_config(&config.rate_limit);
        Self {
            transport,
            cache: Mutex::new(cache),
            limiter,
            hooks: Hooks::new(),
            config,
        }
    }

    /// Register a lifecycle hook. Hooks run in registration order.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn FetchHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.lock_cache().stats()
    }

    pub fn limiter_stats(&self) -> RateLimiterStats {
        self.limiter.stats()
    }

    pub fn cache_entry(&self, key: &str) -> Option<CacheEntryInfo> {
        self.lock_cache().inspect(key)
    }

    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    /// Drop expired cache entries; returns how many were removed.
    pub fn evict_expired(&self) -> usize {
        self.lock_cache().evict_expired()
    }

    /// The cache key `fetch` would use for this URL and options.
    pub fn cache_key(&self, url: &str, options: &RequestOptions) -> Result<String> {
        Ok(self.plan(url, options)?.cache_key)
    }

    /// Fetch `url`, serving it from the cache when possible.
    ///
    /// A cache hit returns immediately without consuming a rate-limit token.
    /// A miss waits for a token, then performs up to `1 + retry` network
    /// attempts; only network failures and timeouts are retried.
    pub async fn fetch(&self, url: &str, options: &RequestOptions) -> Result<FetchResponse> {
        let plan = match self.plan(url, options) {
            Ok(plan) => plan,
            Err(e) => {
                self.hooks.on_error(&e, url).await;
                return Err(e);
            }
        };

        let mut stale = None;
        if plan.cache {
            let lookup = self.lock_cache().lookup(&plan.cache_key);
            match lookup {
                Lookup::Fresh(cached) => {
                    self.trace_phase(&plan, RequestPhase::CacheHit);
                    let status = cached.status;
                    let response = cached.into_response(plan.url.clone(), status);
                    self.hooks.after_response(&response).await;
                    return Ok(response);
                }
                Lookup::Stale(entry) if entry.has_validators() => stale = Some(entry),
                Lookup::Stale(_) | Lookup::Miss => {}
            }
        }

        self.hooks.before_request(&plan.url, options).await;

        let validators = stale.as_ref().map(Validators::from_entry).unwrap_or_default();
        let result = match self.send_with_retry(&plan, options, &validators).await {
            Ok(raw) => self.complete(&plan, raw, stale),
            Err(e) => Err(e),
        };

        match result {
            Ok(response) => {
                self.trace_phase(&plan, RequestPhase::Success);
                self.hooks.after_response(&response).await;
                Ok(response)
            }
            Err(e) => {
                self.trace_phase(&plan, RequestPhase::Failed);
                tracing::warn!(url = %plan.url, error = %e, "fetch failed");
                self.hooks.on_error(&e, &plan.url).await;
                Err(e)
            }
        }
    }

    /// [`fetch`](Self::fetch) followed by `decoder` on the payload.
    pub async fn fetch_decoded<D: Decoder>(
        &self,
        url: &str,
        options: &RequestOptions,
        decoder: &D,
    ) -> Result<D::Output> {
        let response = self.fetch(url, options).await?;
        decoder
            .decode(&response.data)
            .map_err(|e| FetchError::Decode(format!("{}: {e}", response.url)))
    }

    fn plan(&self, url: &str, options: &RequestOptions) -> Result<RequestPlan> {
        let url = resolve_url(self.config.base_url.as_deref(), url)?;
        let cache_key = match &options.cache_key {
            Some(key) => key.clone(),
            None => ResponseCache::<CachedResponse>::generate_key(&url, Some(&options.params)),
        };
        Ok(RequestPlan {
            timeout: options.timeout.unwrap_or_else(|| self.config.timeout()),
            retry: options.retry.unwrap_or(self.config.retry),
            cache: options.cache.unwrap_or(self.config.cache),
            ttl: options.cache_ttl.unwrap_or_else(|| self.config.cache_ttl()),
            cache_key,
            url,
        })
    }

    /// Network attempts for one request. Each attempt takes its own token.
    async fn send_with_retry(
        &self,
        plan: &RequestPlan,
        options: &RequestOptions,
        validators: &Validators,
    ) -> Result<TransportResponse> {
        let headers = self.request_headers(options, validators);
        let attempts = plan.retry.saturating_add(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            if self.limiter.available_tokens() == 0 {
                self.trace_phase(plan, RequestPhase::RateLimited);
            }
            self.limiter.acquire().await;

            self.trace_phase(plan, RequestPhase::InFlight);
            let request = TransportRequest {
                url:     plan.url.clone(),
                headers: headers.clone(),
                timeout: plan.timeout,
            };

            let error = match tokio::time::timeout(plan.timeout, self.transport.send(request)).await {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(TransportError::Network(message))) => FetchError::Network {
                    url: plan.url.clone(),
                    message,
                },
                Ok(Err(TransportError::Timeout)) | Err(_) => FetchError::Timeout {
                    url:     plan.url.clone(),
                    timeout: plan.timeout,
                },
            };

            if attempt >= attempts {
                tracing::debug!(url = %plan.url, attempts, "retries exhausted");
                return Err(error);
            }

            let delay = backoff_delay(
                attempt - 1,
                self.config.retry_backoff(),
                self.config.max_backoff(),
            );
            if self.config.debug {
                tracing::debug!(
                    url = %plan.url,
                    attempt,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    phase = %RequestPhase::Retry,
                    "retrying"
                );
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Turn a raw transport response into the caller's result, updating the
    /// cache on the way.
    fn complete(
        &self,
        plan: &RequestPlan,
        raw: TransportResponse,
        stale: Option<CacheEntry<CachedResponse>>,
    ) -> Result<FetchResponse> {
        if is_not_modified(raw.status) {
            let Some(entry) = stale else {
                return Err(FetchError::Status {
                    url:    plan.url.clone(),
                    status: raw.status,
                });
            };
            let validators =
                Validators::from_entry(&entry).merge(Validators::from_headers(&raw.headers));
            if plan.cache {
                self.lock_cache().set(
                    plan.cache_key.clone(),
                    entry.data.clone(),
                    Some(plan.ttl),
                    validators.etag,
                    validators.last_modified,
                );
            }
            tracing::debug!(url = %plan.url, "revalidated cached response");
            return Ok(entry.data.into_response(plan.url.clone(), raw.status));
        }

        if let Some(error) = classify_status(&plan.url, raw.status, &raw.headers) {
            return Err(error);
        }

        if plan.cache {
            let validators = Validators::from_headers(&raw.headers);
            let cached = CachedResponse {
                data:    raw.body.clone(),
                status:  raw.status,
                headers: raw.headers.clone(),
            };
            self.lock_cache().set(
                plan.cache_key.clone(),
                cached,
                Some(plan.ttl),
                validators.etag,
                validators.last_modified,
            );
        }

        Ok(FetchResponse {
            data:       raw.body,
            status:     raw.status,
            headers:    raw.headers,
            from_cache: false,
            url:        plan.url.clone(),
        })
    }

    /// Config headers, then `User-Agent`, then per-request headers, then
    /// validators. A later header replaces an earlier one of the same name.
    fn request_headers(
        &self,
        options: &RequestOptions,
        validators: &Validators,
    ) -> Vec<(String, String)> {
        let mut headers: Vec<(String, String)> = Vec::new();
        let candidates = self
            .config
            .headers
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .chain(std::iter::once((
                "User-Agent".to_string(),
                self.config.user_agent.clone(),
            )))
            .chain(options.headers.iter().cloned())
            .chain(validators.conditional_headers());

        for (name, value) in candidates {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
            headers.push((name, value));
        }
        headers
    }

    fn trace_phase(&self, plan: &RequestPlan, phase: RequestPhase) {
        if self.config.debug {
            tracing::debug!(url = %plan.url, key = %plan.cache_key, %phase, "request phase");
        }
    }

    fn lock_cache(&self) -> MutexGuard<'_, ResponseCache<CachedResponse>> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(feature = "reqwest")]
impl Client<crate::effects::transport::ReqwestTransport> {
    /// Client backed by a default reqwest transport.
    pub fn with_reqwest(config: ClientConfig) -> std::result::Result<Self, TransportError> {
        Ok(Self::new(
            crate::effects::transport::ReqwestTransport::new()?,
            config,
        ))
    }
}
