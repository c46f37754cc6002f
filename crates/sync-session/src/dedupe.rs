//! TTL-bounded dedupe cache for messages arriving via pubsub (spec §4.G
//! item 5, §4.J).

use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Tracks recently seen message IDs so a message echoed back by pubsub
/// is dropped rather than re-processed and re-broadcast.
pub struct DedupeCache {
    seen: DashMap<String, Instant>,
    ttl: Duration,
}

impl DedupeCache {
    /// A cache that forgets an ID `ttl` after it was last inserted.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            seen: DashMap::new(),
            ttl,
        }
    }

    /// Record `message_id` as seen, pruning anything past its TTL.
    ///
    /// Used for messages arriving from a client: the session always
    /// records its own accepted messages so the pubsub echo of the
    /// same ID is recognized as a duplicate.
    pub fn insert(&self, message_id: &str) {
        self.purge_expired();
        self.seen.insert(message_id.to_string(), Instant::now());
    }

    /// Whether `message_id` has already been seen (and not yet expired).
    ///
    /// Used for messages arriving via pubsub: `true` means drop it.
    #[must_use]
    pub fn is_duplicate(&self, message_id: &str) -> bool {
        self.seen.contains_key(message_id)
    }

    fn purge_expired(&self) {
        let ttl = self.ttl;
        let now = Instant::now();
        self.seen.retain(|_, inserted_at| now.duration_since(*inserted_at) < ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fresh_id_is_not_a_duplicate() {
        let cache = DedupeCache::new(Duration::from_secs(60));
        assert!(!cache.is_duplicate("m1"));
    }

    #[tokio::test(start_paused = true)]
    async fn inserted_id_is_reported_as_duplicate() {
        let cache = DedupeCache::new(Duration::from_secs(60));
        cache.insert("m1");
        assert!(cache.is_duplicate("m1"));
    }

    #[tokio::test(start_paused = true)]
    async fn id_expires_after_ttl() {
        let cache = DedupeCache::new(Duration::from_millis(100));
        cache.insert("m1");
        assert!(cache.is_duplicate("m1"));
        tokio::time::advance(Duration::from_millis(200)).await;
        cache.insert("m2");
        assert!(!cache.is_duplicate("m1"));
    }
}
