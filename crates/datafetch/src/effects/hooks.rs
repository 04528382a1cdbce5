//! Hook traits for the request lifecycle.
//!
//! Hooks observe requests; they cannot change the outcome. A failing hook is
//! logged and skipped, and the request carries on as if it had succeeded.

use std::sync::Arc;

use async_trait::async_trait;

use crate::data::{FetchResponse, RequestOptions};
use crate::error::{FetchError, HookError};

/// Implement this to observe the lifecycle of every `fetch`.
#[async_trait]
pub trait FetchHook: Send + Sync {
    /// Name of this hook for error reporting.
    fn name(&self) -> &'static str;

    /// Called on a cache miss, before waiting for a rate-limit token.
    async fn before_request(&self, _url: &str, _options: &RequestOptions) -> Result<(), HookError> {
        Ok(())
    }

    /// Called with every successful response, cached or not.
    async fn after_response(&self, _response: &FetchResponse) -> Result<(), HookError> {
        Ok(())
    }

    /// Called once with the terminal error of a failed request.
    async fn on_error(&self, _error: &FetchError, _url: &str) -> Result<(), HookError> {
        Ok(())
    }
}

/// Ordered set of hooks run at each lifecycle point.
#[derive(Clone, Default)]
pub struct Hooks {
    hooks: Vec<Arc<dyn FetchHook>>,
}

impl std::fmt::Debug for Hooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.name()))
            .finish()
    }
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: Arc<dyn FetchHook>) {
        self.hooks.push(hook);
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub async fn before_request(&self, url: &str, options: &RequestOptions) {
        for hook in &self.hooks {
            if let Err(e) = hook.before_request(url, options).await {
                log_failure(hook.as_ref(), "before_request", &e);
            }
        }
    }

    pub async fn after_response(&self, response: &FetchResponse) {
        for hook in &self.hooks {
            if let Err(e) = hook.after_response(response).await {
                log_failure(hook.as_ref(), "after_response", &e);
            }
        }
    }

    pub async fn on_error(&self, error: &FetchError, url: &str) {
        for hook in &self.hooks {
            if let Err(e) = hook.on_error(error, url).await {
                log_failure(hook.as_ref(), "on_error", &e);
            }
        }
    }
}

fn log_failure(hook: &dyn FetchHook, stage: &'static str, error: &HookError) {
    tracing::warn!(hook = hook.name(), stage, error = %error, "hook failed, ignoring");
}

/// Hook that records every lifecycle event as a `tracing` event.
pub struct TracingHook;

#[async_trait]
impl FetchHook for TracingHook {
    fn name(&self) -> &'static str {
        "tracing"
    }

    async fn before_request(&self, url: &str, _options: &RequestOptions) -> Result<(), HookError> {
        tracing::info!(url, "requesting");
        Ok(())
    }

    async fn after_response(&self, response: &FetchResponse) -> Result<(), HookError> {
        tracing::info!(
            url = %response.url,
            status = response.status,
            from_cache = response.from_cache,
            bytes = response.data.len(),
            "response received"
        );
        Ok(())
    }

    async fn on_error(&self, error: &FetchError, url: &str) -> Result<(), HookError> {
        tracing::error!(url, error = %error, "request failed");
        Ok(())
    }
}
