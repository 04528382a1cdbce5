//! Token bucket admission control with a FIFO waiter queue.
//!
//! Tokens refill continuously at `max_requests / interval` per millisecond and
//! are computed lazily whenever the bucket is observed. Callers that find the
//! bucket empty queue up and are admitted strictly in arrival order.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::oneshot;
use tokio::time::Instant;

use crate::data::RateLimitConfig;

/// Lower bound on how long a queued caller sleeps between bucket checks.
const MIN_WAIT: Duration = Duration::from_millis(1);

/// Read-only snapshot of a [`RateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateLimiterStats {
    pub available_tokens: u32,
    pub max_tokens:       u32,
    pub queue_length:     usize,
}

struct Waiter {
    id: u64,
    tx: oneshot::Sender<()>,
}

struct Bucket {
    tokens:      f64,
    last_refill: Instant,
    waiters:     VecDeque<Waiter>,
    next_id:     u64,
}

/// Token bucket rate limiter.
///
/// Safe to share between tasks; every mutation happens under one lock so a
/// refill, a grant and a decrement are never observed half-done.
pub struct RateLimiter {
    max_tokens:  f64,
    interval_ms: f64,
    bucket:      Mutex<Bucket>,
}

impl RateLimiter {
    /// Create a full bucket holding `max_requests` tokens that refills
    /// completely over `interval`.
    ///
    /// Both values are clamped to a minimum of 1 (token / millisecond).
    pub fn new(max_requests: u32, interval: Duration) -> Self {
        let max_tokens = f64::from(max_requests.max(1));
        let interval_ms = (interval.as_nanos() as f64 / 1_000_000.0).max(1.0);
        Self {
            max_tokens,
            interval_ms,
            bucket: Mutex::new(Bucket {
                tokens:      max_tokens,
                last_refill: Instant::now(),
                waiters:     VecDeque::new(),
                next_id:     0,
            }),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, config.interval())
    }

    /// Take one token, waiting in line if the bucket is empty.
    ///
    /// Never fails. Dropping the returned future before it completes removes
    /// the caller from the queue without reordering the callers behind it.
    pub async fn acquire(&self) {
        let (id, rx) = {
            let mut bucket = self.lock();
            self.refill(&mut bucket);
            if bucket.waiters.is_empty() && bucket.tokens >= 1.0 {
                bucket.tokens -= 1.0;
                return;
            }
            let id = bucket.next_id;
            bucket.next_id += 1;
            let (tx, rx) = oneshot::channel();
            bucket.waiters.push_back(Waiter { id, tx });
            tracing::trace!(waiter = id, queued = bucket.waiters.len(), "rate limiter queued caller");
            (id, rx)
        };

        let mut pending = PendingAcquire {
            limiter: self,
            id,
            rx,
            done: false,
        };

        loop {
            let wait = self.time_until_next_token().max(MIN_WAIT);
            let admitted = tokio::select! {
                biased;
                _ = &mut pending.rx => true,
                _ = tokio::time::sleep(wait) => false,
            };
            if admitted {
                pending.done = true;
                return;
            }
        }
    }

    /// Take one token if it is available right now and nobody is queued.
    pub fn try_acquire(&self) -> bool {
        let mut bucket = self.lock();
        self.refill(&mut bucket);
        if bucket.waiters.is_empty() && bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Whole tokens currently available. The fractional remainder is kept.
    pub fn available_tokens(&self) -> u32 {
        let mut bucket = self.lock();
        self.refill(&mut bucket);
        bucket.tokens.floor() as u32
    }

    /// Time until at least one whole token is available; zero if one already is.
    pub fn time_until_next_token(&self) -> Duration {
        let mut bucket = self.lock();
        self.refill(&mut bucket);
        self.shortfall_delay(bucket.tokens)
    }

    /// Refill the bucket to capacity and admit every queued caller in order.
    ///
    /// Each admitted caller consumes a token; the count bottoms out at zero
    /// when more callers were waiting than the bucket holds.
    pub fn reset(&self) {
        let mut bucket = self.lock();
        bucket.tokens = self.max_tokens;
        bucket.last_refill = Instant::now();
        let mut released = 0usize;
        while let Some(waiter) = bucket.waiters.pop_front() {
            if waiter.tx.send(()).is_ok() {
                bucket.tokens = (bucket.tokens - 1.0).max(0.0);
                released += 1;
            }
        }
        tracing::debug!(released, "rate limiter reset");
    }

    pub fn stats(&self) -> RateLimiterStats {
        let mut bucket = self.lock();
        self.refill(&mut bucket);
        RateLimiterStats {
            available_tokens: bucket.tokens.floor() as u32,
            max_tokens:       self.max_tokens as u32,
            queue_length:     bucket.waiters.len(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Bucket> {
        self.bucket.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply elapsed refill, then hand tokens to queued callers front to back.
    fn refill(&self, bucket: &mut Bucket) {
        let now = Instant::now();
        let elapsed_ms = now.duration_since(bucket.last_refill).as_nanos() as f64 / 1_000_000.0;
        if elapsed_ms > 0.0 {
            let gained = elapsed_ms * self.max_tokens / self.interval_ms;
            bucket.tokens = (bucket.tokens + gained).min(self.max_tokens);
            bucket.last_refill = now;
        }

        while bucket.tokens >= 1.0 {
            let Some(waiter) = bucket.waiters.pop_front() else {
                break;
            };
            // A closed receiver belongs to a caller that went away; its
            // token stays in the bucket for the next in line.
            if waiter.tx.send(()).is_ok() {
                bucket.tokens -= 1.0;
            }
        }
    }

    fn shortfall_delay(&self, tokens: f64) -> Duration {
        if tokens >= 1.0 {
            return Duration::ZERO;
        }
        let missing_ms = (1.0 - tokens) * self.interval_ms / self.max_tokens;
        // Saturate: an interval near `Duration::MAX` overflows the conversion.
        Duration::try_from_secs_f64(missing_ms.max(0.0) / 1000.0).unwrap_or(Duration::MAX)
    }

    fn cancel(&self, id: u64, granted: bool) {
        let mut bucket = self.lock();
        if let Some(pos) = bucket.waiters.iter().position(|w| w.id == id) {
            bucket.waiters.remove(pos);
            tracing::trace!(waiter = id, "rate limiter waiter cancelled");
        } else if granted {
            bucket.tokens = (bucket.tokens + 1.0).min(self.max_tokens);
            self.refill(&mut bucket);
        }
    }
}

/// Queue slot owned by an in-progress `acquire`.
struct PendingAcquire<'a> {
    limiter: &'a RateLimiter,
    id:      u64,
    rx:      oneshot::Receiver<()>,
    done:    bool,
}

impl Drop for PendingAcquire<'_> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        // Granted but never observed: give the token back.
        let granted = self.rx.try_recv().is_ok();
        self.limiter.cancel(self.id, granted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    async fn advance_ms(ms: u64) {
        tokio::time::advance(Duration::from_millis(ms)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_full() {
        let limiter = RateLimiter::new(5, Duration::from_secs(1));
        assert_eq!(limiter.available_tokens(), 5);
        assert_eq!(limiter.time_until_next_token(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_is_linear() {
        let limiter = RateLimiter::new(100, Duration::from_millis(10_000));
        for _ in 0..100 {
            limiter.acquire().await;
        }
        assert_eq!(limiter.available_tokens(), 0);

        advance_ms(1000).await;
        assert_eq!(limiter.available_tokens(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fractional_tokens_accumulate() {
        let limiter = RateLimiter::new(10, Duration::from_millis(1000));
        limiter.acquire().await;
        limiter.acquire().await;
        assert_eq!(limiter.available_tokens(), 8);

        advance_ms(150).await;
        assert_eq!(limiter.available_tokens(), 9);

        // The half token from the previous read is carried forward.
        advance_ms(50).await;
        assert_eq!(limiter.available_tokens(), 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_reads_do_not_lose_fractions() {
        let limiter = RateLimiter::new(10, Duration::from_millis(1000));
        for _ in 0..10 {
            limiter.acquire().await;
        }
        for _ in 0..3 {
            advance_ms(25).await;
            assert_eq!(limiter.available_tokens(), 0);
        }
        advance_ms(25).await;
        assert_eq!(limiter.available_tokens(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokens_never_exceed_capacity() {
        let limiter = RateLimiter::new(3, Duration::from_millis(300));
        advance_ms(10_000).await;
        assert_eq!(limiter.available_tokens(), 3);

        for step in 0..20u64 {
            if step % 3 == 0 {
                let _ = limiter.try_acquire();
            }
            advance_ms(step * 7).await;
            let tokens = limiter.available_tokens();
            assert!(tokens <= 3, "tokens {tokens} above capacity");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_time_until_next_token() {
        let limiter = RateLimiter::new(1, Duration::from_millis(1000));
        limiter.acquire().await;
        assert_eq!(limiter.time_until_next_token(), Duration::from_millis(1000));

        advance_ms(400).await;
        let wait = limiter.time_until_next_token();
        assert!(wait <= Duration::from_millis(600));
        assert!(wait >= Duration::from_millis(599));

        advance_ms(600).await;
        assert_eq!(limiter.time_until_next_token(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_try_acquire_does_not_wait() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.try_acquire());
        assert!(!limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_bucket_suspends_until_refill() {
        let limiter = RateLimiter::new(1, Duration::from_millis(500));
        limiter.acquire().await;

        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(500));
        assert_eq!(limiter.available_tokens(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiters_served_in_arrival_order() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_millis(100)));
        limiter.acquire().await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        for i in 0..4 {
            let limiter = Arc::clone(&limiter);
            let tx = tx.clone();
            tokio::spawn(async move {
                limiter.acquire().await;
                let _ = tx.send(i);
            });
            tokio::task::yield_now().await;
        }
        drop(tx);

        let mut order = Vec::new();
        while let Some(i) = rx.recv().await {
            order.push(i);
        }
        assert_eq!(order, vec![0, 1, 2, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_waiter_leaves_queue() {
        let limiter = Arc::new(RateLimiter::new(1, Duration::from_millis(100)));
        limiter.acquire().await;

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut handles = Vec::new();
        for i in 0..3 {
            let limiter = Arc::clone(&limiter);
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                limiter.acquire().await;
                let _ = tx.send(i);
            }));
            tokio::task::yield_now().await;
        }
        drop(tx);
        assert_eq!(limiter.stats().queue_length, 3);

        let cancelled = handles.remove(1);
        cancelled.abort();
        assert!(cancelled.await.unwrap_err().is_cancelled());
        assert_eq!(limiter.stats().queue_length, 2);

        let mut order = Vec::new();
        while let Some(i) = rx.recv().await {
            order.push(i);
        }
        assert_eq!(order, vec![0, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_acquire_future_is_removed() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        limiter.acquire().await;

        let timed_out = tokio::time::timeout(Duration::from_millis(50), limiter.acquire()).await;
        assert!(timed_out.is_err());
        assert_eq!(limiter.stats().queue_length, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_releases_waiters() {
        let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(3600)));
        limiter.acquire().await;
        limiter.acquire().await;

        let mut handles = Vec::new();
        for _ in 0..3 {
            let limiter = Arc::clone(&limiter);
            handles.push(tokio::spawn(async move { limiter.acquire().await }));
            tokio::task::yield_now().await;
        }
        assert_eq!(limiter.stats().queue_length, 3);

        limiter.reset();
        for handle in handles {
            handle.await.unwrap();
        }

        let stats = limiter.stats();
        assert_eq!(stats.queue_length, 0);
        assert_eq!(stats.available_tokens, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_restores_capacity() {
        let limiter = RateLimiter::new(4, Duration::from_secs(60));
        for _ in 0..4 {
            limiter.acquire().await;
        }
        limiter.reset();
        assert_eq!(
            limiter.stats(),
            RateLimiterStats {
                available_tokens: 4,
                max_tokens:       4,
                queue_length:     0,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_capacity_is_clamped() {
        let limiter = RateLimiter::new(0, Duration::ZERO);
        assert_eq!(limiter.stats().max_tokens, 1);
        assert!(limiter.try_acquire());
    }

    #[tokio::test(start_paused = true)]
    async fn test_huge_interval_saturates_wait() {
        let limiter = RateLimiter::new(1, Duration::MAX);
        limiter.acquire().await;

        assert!(limiter.time_until_next_token() >= Duration::from_secs(u64::MAX / 2));

        let blocked = tokio::time::timeout(Duration::from_secs(1), limiter.acquire()).await;
        assert!(blocked.is_err());
        assert_eq!(limiter.stats().queue_length, 0);
    }
}
