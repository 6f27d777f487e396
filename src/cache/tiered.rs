//! Multi-Tier Cache
//!
//! Composes three [`LruTtlCache`] levels. Lookups probe L1, then L2,
//! then L3; a hit below L1 moves the entry one level up so hot keys
//! migrate toward the fastest tier. Level 2 optionally holds its
//! payloads compressed. Background sweeper tasks reap expired entries
//! on a fixed cadence until the cache is closed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cache::lru::{CacheItem, CacheValue, LruTtlCache};
use crate::cache::{
    CacheLevel, CacheStats, CacheStatsSnapshot, CompressionCodec, EstimateSize, PassthroughCodec,
};

/// Per-level capacities and TTLs plus maintenance settings.
#[derive(Debug, Clone)]
pub struct TieredCacheConfig {
    pub l1_capacity: usize,
    pub l1_ttl: Duration,
    pub l2_capacity: usize,
    pub l2_ttl: Duration,
    pub l3_capacity: usize,
    pub l3_ttl: Duration,
    /// Compress payloads stored at L2
    pub compression_enabled: bool,
    /// How often sweepers reap expired entries
    pub maintenance_interval: Duration,
    /// Number of sweeper tasks
    pub parallelism: usize,
}

impl Default for TieredCacheConfig {
    fn default() -> Self {
        Self {
            l1_capacity: 1_000,
            l1_ttl: Duration::from_secs(5 * 60),
            l2_capacity: 10_000,
            l2_ttl: Duration::from_secs(30 * 60),
            l3_capacity: 100_000,
            l3_ttl: Duration::from_secs(2 * 60 * 60),
            compression_enabled: true,
            maintenance_interval: Duration::from_secs(60),
            parallelism: 2,
        }
    }
}

/// Three-level cache with promotion and background maintenance.
///
/// Must be created inside a tokio runtime; the sweeper tasks are
/// spawned at construction and stopped by [`MultiTierCache::close`] or
/// when the cache is dropped.
pub struct MultiTierCache<V> {
    l1: Arc<LruTtlCache<V>>,
    l2: Arc<LruTtlCache<V>>,
    l3: Arc<LruTtlCache<V>>,
    stats: Arc<CacheStats>,
    codec: Arc<dyn CompressionCodec>,
    config: TieredCacheConfig,
    shutdown: watch::Sender<bool>,
    sweepers: Mutex<Vec<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl<V> MultiTierCache<V>
where
    V: Clone + Serialize + DeserializeOwned + EstimateSize + Send + Sync + 'static,
{
    pub fn new(config: TieredCacheConfig) -> Self {
        Self::with_codec(config, Arc::new(PassthroughCodec))
    }

    pub fn with_codec(config: TieredCacheConfig, codec: Arc<dyn CompressionCodec>) -> Self {
        let l1 = Arc::new(LruTtlCache::new(config.l1_capacity, config.l1_ttl));
        let l2 = Arc::new(LruTtlCache::new(config.l2_capacity, config.l2_ttl));
        let l3 = Arc::new(LruTtlCache::new(config.l3_capacity, config.l3_ttl));
        let stats = Arc::new(CacheStats::default());
        let (shutdown, _) = watch::channel(false);

        let mut sweepers = Vec::with_capacity(config.parallelism.max(1));
        for worker in 0..config.parallelism.max(1) {
            sweepers.push(spawn_sweeper(
                worker,
                config.maintenance_interval,
                Arc::clone(&l1),
                Arc::clone(&l2),
                Arc::clone(&l3),
                Arc::clone(&stats),
                shutdown.subscribe(),
            ));
        }

        Self {
            l1,
            l2,
            l3,
            stats,
            codec,
            config,
            shutdown,
            sweepers: Mutex::new(sweepers),
            closed: AtomicBool::new(false),
        }
    }

    /// Look up a key across all levels. A hit at L2 or L3 promotes the
    /// entry one level up, preserving its hit count and size; the level
    /// lock is released before the higher level is touched.
    pub fn get(&self, key: &str) -> Option<V> {
        if let Some(item) = self.l1.get(key) {
            self.stats.record_hit(CacheLevel::L1);
            return self.expose(item);
        }

        if let Some(item) = self.l2.get(key) {
            self.stats.record_hit(CacheLevel::L2);
            self.l2.delete(key);
            let value = self.expose(item.clone())?;
            let mut promoted = item;
            promoted.value = CacheValue::Plain(value.clone());
            promoted.compressed = false;
            promoted.level = CacheLevel::L1;
            promoted.last_accessed = Instant::now();
            self.stats.record_evictions(self.l1.set(promoted) as u64);
            return Some(value);
        }

        if let Some(item) = self.l3.get(key) {
            self.stats.record_hit(CacheLevel::L3);
            self.l3.delete(key);
            let value = self.expose(item.clone())?;
            let mut promoted = item;
            promoted.level = CacheLevel::L2;
            promoted.last_accessed = Instant::now();
            self.stats.record_evictions(self.l2.set(promoted) as u64);
            return Some(value);
        }

        self.stats.record_miss();
        None
    }

    /// Store a value at the given level with that level's default TTL.
    pub fn set(&self, key: &str, value: V, level: CacheLevel) {
        let size = value.estimate_size();
        let (stored, compressed) = if level == CacheLevel::L2 && self.config.compression_enabled {
            match bincode::serialize(&value) {
                Ok(raw) => {
                    let packed = self.codec.compress(&raw);
                    self.stats.record_compression();
                    (CacheValue::Encoded(packed), true)
                }
                Err(e) => {
                    log::warn!("storing {key} uncompressed, encoding failed: {e}");
                    (CacheValue::Plain(value), false)
                }
            }
        } else {
            (CacheValue::Plain(value), false)
        };

        let mut item = CacheItem::new(key, stored, level, size);
        item.compressed = compressed;
        let evicted = self.level(level).set(item);
        self.stats.record_evictions(evicted as u64);
    }

    /// Store at L1 with a caller-chosen TTL.
    pub fn set_with_ttl(&self, key: &str, value: V, ttl: Duration) {
        let size = value.estimate_size();
        let item = CacheItem::new(key, CacheValue::Plain(value), CacheLevel::L1, size);
        let evicted = self.l1.set_with_ttl(item, ttl);
        self.stats.record_evictions(evicted as u64);
    }

    /// Remove a key from every level. Idempotent.
    pub fn delete(&self, key: &str) {
        self.l1.delete(key);
        self.l2.delete(key);
        self.l3.delete(key);
    }

    /// Drop every entry from every level.
    pub fn clear(&self) {
        self.l1.clear();
        self.l2.clear();
        self.l3.clear();
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }

    /// Entry counts per level, fastest first.
    pub fn level_sizes(&self) -> (usize, usize, usize) {
        (self.l1.len(), self.l2.len(), self.l3.len())
    }

    /// Stop the sweepers, wait for them to exit and drop all entries.
    /// Idempotent.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let _ = self.shutdown.send(true);
        let handles = std::mem::take(&mut *self.sweepers.lock());
        for handle in handles {
            let _ = handle.await;
        }
        self.clear();
        log::info!("multi-tier cache closed");
    }

    fn level(&self, level: CacheLevel) -> &LruTtlCache<V> {
        match level {
            CacheLevel::L1 => &self.l1,
            CacheLevel::L2 => &self.l2,
            CacheLevel::L3 => &self.l3,
        }
    }

    /// Materialize an item's payload, decoding it when compressed.
    fn expose(&self, item: CacheItem<V>) -> Option<V> {
        match item.value {
            CacheValue::Plain(value) => Some(value),
            CacheValue::Encoded(bytes) => {
                let raw = match self.codec.decompress(&bytes) {
                    Ok(raw) => raw,
                    Err(e) => {
                        log::warn!("dropping cache entry {}: {e}", item.key);
                        return None;
                    }
                };
                self.stats.record_decompression();
                match bincode::deserialize(&raw) {
                    Ok(value) => Some(value),
                    Err(e) => {
                        log::warn!("dropping undecodable cache entry {}: {e}", item.key);
                        None
                    }
                }
            }
        }
    }
}

fn spawn_sweeper<V: Clone + Send + Sync + 'static>(
    worker: usize,
    cadence: Duration,
    l1: Arc<LruTtlCache<V>>,
    l2: Arc<LruTtlCache<V>>,
    l3: Arc<LruTtlCache<V>>,
    stats: Arc<CacheStats>,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cadence);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick fires immediately; skip it so a fresh cache is
        // not swept before anything is inserted.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {
                    let removed = l1.cleanup() + l2.cleanup() + l3.cleanup();
                    stats.record_evictions(removed as u64);
                    if removed > 0 {
                        log::debug!("cache sweeper {worker} removed {removed} expired entries");
                    }
                }
            }
        }
    })
}
