//! Token-bucket rate limiting, generalized from a per-IP/per-session
//! limiter to the spec's `{maxMessages, windowMs, maxMessageSize}`
//! subject keys — a subject being whatever the caller keys the bucket
//! on: a user ID, a document name, or a connection ID (spec §4.C, also
//! used by §4.H).

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sync_streams::{Sink, StreamError};
use tokio::time::Instant;
use sync_wire::Message;

/// Rate limit parameters for one subject.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Maximum messages allowed per `window`.
    pub max_messages: u32,
    /// The refill window.
    pub window: Duration,
    /// Maximum encoded message size in bytes; larger messages are
    /// rejected outright regardless of remaining tokens.
    pub max_message_size: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_messages: 100,
            window: Duration::from_secs(1),
            max_message_size: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(config: &RateLimitConfig) -> Self {
        Self {
            tokens: f64::from(config.max_messages),
            max_tokens: f64::from(config.max_messages),
            refill_rate: f64::from(config.max_messages) / config.window.as_secs_f64(),
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);
        self.last_refill = now;
    }

    fn try_consume(&mut self, amount: f64) -> bool {
        self.refill();
        if self.tokens >= amount {
            self.tokens -= amount;
            true
        } else {
            false
        }
    }
}

/// Rejection counters, exposed for metrics/observability.
#[derive(Debug, Default)]
pub struct RateLimitMetrics {
    /// Messages allowed.
    pub allowed: AtomicU64,
    /// Messages rejected for exceeding the token bucket.
    pub rejected: AtomicU64,
    /// Messages rejected for exceeding `max_message_size`.
    pub oversized: AtomicU64,
}

/// Per-subject token-bucket rate limiter.
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: DashMap<String, TokenBucket>,
    metrics: RateLimitMetrics,
}

impl RateLimiter {
    /// Build a limiter with the given configuration.
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: DashMap::new(),
            metrics: RateLimitMetrics::default(),
        }
    }

    /// Check and consume one token for `subject`, given `message_size`
    /// bytes. Returns `true` if the message is allowed.
    pub fn check(&self, subject: &str, message_size: usize) -> bool {
        if message_size > self.config.max_message_size {
            self.metrics.oversized.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let mut bucket = self
            .buckets
            .entry(subject.to_string())
            .or_insert_with(|| TokenBucket::new(&self.config));

        if bucket.try_consume(1.0) {
            self.metrics.allowed.fetch_add(1, Ordering::Relaxed);
            true
        } else {
            self.metrics.rejected.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Drop the bucket for `subject` (e.g. on session teardown).
    pub fn remove(&self, subject: &str) {
        self.buckets.remove(subject);
    }

    /// Snapshot the current metrics.
    #[must_use]
    pub fn metrics(&self) -> (u64, u64, u64) {
        (
            self.metrics.allowed.load(Ordering::Relaxed),
            self.metrics.rejected.load(Ordering::Relaxed),
            self.metrics.oversized.load(Ordering::Relaxed),
        )
    }
}

/// A `Sink` that rejects writes once the subject's token bucket is
/// empty, or the message exceeds the configured size cap.
pub struct RateLimitingSink {
    inner: Box<dyn Sink<Message> + Send>,
    limiter: Arc<RateLimiter>,
    subject: Arc<dyn Fn(&Message) -> String + Send + Sync>,
}

impl RateLimitingSink {
    /// Wrap `inner`; `subject` derives the rate-limit key from each message.
    #[must_use]
    pub fn new(
        inner: Box<dyn Sink<Message> + Send>,
        limiter: Arc<RateLimiter>,
        subject: Arc<dyn Fn(&Message) -> String + Send + Sync>,
    ) -> Self {
        Self {
            inner,
            limiter,
            subject,
        }
    }
}

#[async_trait]
impl Sink<Message> for RateLimitingSink {
    async fn send(&mut self, item: Message) -> Result<(), StreamError> {
        let encoded_len = item.encode().len();
        let subject = (self.subject)(&item);
        if !self.limiter.check(&subject, encoded_len) {
            return Err(StreamError::aborted("rate limit exceeded"));
        }
        self.inner.send(item).await
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        self.inner.close().await
    }

    fn abort(&mut self, reason: &'static str) {
        self.inner.abort(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_max_then_rejects() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_messages: 3,
            window: Duration::from_secs(60),
            max_message_size: 1024,
        });
        for _ in 0..3 {
            assert!(limiter.check("user-1", 10));
        }
        assert!(!limiter.check("user-1", 10));
        let (allowed, rejected, _) = limiter.metrics();
        assert_eq!(allowed, 3);
        assert_eq!(rejected, 1);
    }

    #[tokio::test]
    async fn oversized_message_rejected_regardless_of_tokens() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_messages: 100,
            window: Duration::from_secs(60),
            max_message_size: 10,
        });
        assert!(!limiter.check("user-1", 11));
    }

    #[tokio::test]
    async fn distinct_subjects_have_independent_buckets() {
        let limiter = RateLimiter::new(RateLimitConfig {
            max_messages: 1,
            window: Duration::from_secs(60),
            max_message_size: 1024,
        });
        assert!(limiter.check("user-1", 1));
        assert!(limiter.check("user-2", 1));
        assert!(!limiter.check("user-1", 1));
    }

    #[tokio::test]
    async fn bucket_refills_over_time() {
        tokio::time::pause();
        let limiter = RateLimiter::new(RateLimitConfig {
            max_messages: 1,
            window: Duration::from_millis(100),
            max_message_size: 1024,
        });
        assert!(limiter.check("user-1", 1));
        assert!(!limiter.check("user-1", 1));
        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(limiter.check("user-1", 1));
    }
}
