//! In-process seen store
//!
//! Useful for tests and single-process development. Expiry is evaluated
//! lazily on access against a monotonic clock.

use crate::error::StoreResult;
use crate::store::SeenStore;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct InMemorySeenStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl InMemorySeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored value for `key`, if present and unexpired
    pub fn get(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries
            .lock()
            .get(key)
            .filter(|entry| entry.expires_at > now)
            .map(|entry| entry.value.clone())
    }

    /// Remaining lifetime of `key`
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .lock()
            .get(key)
            .and_then(|entry| entry.expires_at.checked_duration_since(now))
            .filter(|remaining| !remaining.is_zero())
    }

    /// Number of unexpired keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(entries: &mut HashMap<String, Entry>, key: &str, value: &str, ttl_secs: u64) {
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + Duration::from_secs(ttl_secs),
            },
        );
    }
}

#[async_trait]
impl SeenStore for InMemorySeenStore {
    async fn exists(&self, key: &str) -> StoreResult<bool> {
        Ok(self.get(key).is_some())
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<()> {
        Self::insert(&mut self.entries.lock(), key, value, ttl_secs);
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl_secs: u64) -> StoreResult<bool> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        let live = entries
            .get(key)
            .map(|entry| entry.expires_at > now)
            .unwrap_or(false);
        if live {
            return Ok(false);
        }

        Self::insert(&mut entries, key, value, ttl_secs);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_ex_and_exists() {
        let store = InMemorySeenStore::new();
        assert!(!store.exists("login:abc").await.unwrap());

        store.set_ex("login:abc", "payload", 60).await.unwrap();

        assert!(store.exists("login:abc").await.unwrap());
        assert_eq!(store.get("login:abc").as_deref(), Some("payload"));
        let ttl = store.ttl("login:abc").unwrap();
        assert!(ttl <= Duration::from_secs(60) && ttl > Duration::from_secs(55));
    }

    #[tokio::test]
    async fn test_zero_ttl_expires_immediately() {
        let store = InMemorySeenStore::new();
        store.set_ex("k", "v", 0).await.unwrap();

        assert!(!store.exists("k").await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_set_nx_ex_only_first_wins() {
        let store = InMemorySeenStore::new();

        assert!(store.set_nx_ex("k", "first", 60).await.unwrap());
        assert!(!store.set_nx_ex("k", "second", 60).await.unwrap());
        assert_eq!(store.get("k").as_deref(), Some("first"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = InMemorySeenStore::new();
        let other = store.clone();

        store.set_ex("k", "v", 60).await.unwrap();
        assert!(other.exists("k").await.unwrap());
    }
}
