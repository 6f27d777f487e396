//! Capacity-Bounded LRU with Per-Entry TTL
//!
//! One cache level: a strictly bounded least-recently-used map whose
//! entries also expire after a time-to-live. Expired entries vanish on
//! access and are reaped in bulk by [`LruTtlCache::cleanup`].

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::cache::CacheLevel;

/// Stored payload: either the live value or its codec-encoded bytes.
#[derive(Debug, Clone)]
pub enum CacheValue<V> {
    Plain(V),
    Encoded(Vec<u8>),
}

/// One cache entry with its bookkeeping.
#[derive(Debug, Clone)]
pub struct CacheItem<V> {
    pub key: String,
    pub value: CacheValue<V>,
    pub level: CacheLevel,
    pub created: Instant,
    pub last_accessed: Instant,
    pub expires_at: Instant,
    pub hits: u64,
    pub size: usize,
    pub compressed: bool,
}

impl<V> CacheItem<V> {
    /// Build a fresh entry; the expiry is stamped when the entry is
    /// inserted into a level.
    pub fn new(key: impl Into<String>, value: CacheValue<V>, level: CacheLevel, size: usize) -> Self {
        let now = Instant::now();
        Self {
            key: key.into(),
            value,
            level,
            created: now,
            last_accessed: now,
            expires_at: now,
            hits: 0,
            size,
            compressed: false,
        }
    }
}

/// A single cache level.
pub struct LruTtlCache<V> {
    inner: Mutex<lru::LruCache<String, CacheItem<V>>>,
    capacity: usize,
    default_ttl: Duration,
}

impl<V: Clone> LruTtlCache<V> {
    pub fn new(capacity: usize, default_ttl: Duration) -> Self {
        let bounded = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(lru::LruCache::new(bounded)),
            capacity: bounded.get(),
            default_ttl,
        }
    }

    /// Look up a key, refreshing its recency and hit count. An expired
    /// entry is removed and reported as absent.
    pub fn get(&self, key: &str) -> Option<CacheItem<V>> {
        let now = Instant::now();
        let mut map = self.inner.lock();

        let expired = map.peek(key).map(|item| item.expires_at <= now)?;
        if expired {
            map.pop(key);
            return None;
        }

        let item = map.get_mut(key)?;
        item.last_accessed = now;
        item.hits += 1;
        Some(item.clone())
    }

    /// Insert with the level's default TTL. Returns true when a
    /// different entry was evicted to make room.
    pub fn set(&self, item: CacheItem<V>) -> bool {
        self.set_with_ttl(item, self.default_ttl)
    }

    /// Insert with an explicit TTL.
    pub fn set_with_ttl(&self, mut item: CacheItem<V>, ttl: Duration) -> bool {
        item.expires_at = Instant::now() + ttl;
        let key = item.key.clone();
        let mut map = self.inner.lock();
        match map.push(key.clone(), item) {
            Some((old_key, _)) => old_key != key,
            None => false,
        }
    }

    pub fn delete(&self, key: &str) -> Option<CacheItem<V>> {
        self.inner.lock().pop(key)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    /// Remove every expired entry, returning how many were dropped.
    pub fn cleanup(&self) -> usize {
        let now = Instant::now();
        let mut map = self.inner.lock();
        let expired: Vec<String> = map
            .iter()
            .filter(|(_, item)| item.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            map.pop(key);
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().iter().map(|(key, _)| key.clone()).collect()
    }
}
