//! Multi-Tier Caching Module
//!
//! A three-level LRU+TTL cache used to amortize repeated lookups over
//! the ledger and derived structures. Level 1 is small and hot, level 2
//! holds more entries and may compress them, level 3 is the large cold
//! store. Entries migrate toward level 1 as they are accessed.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

pub mod lru;
pub mod tiered;

// Re-export main types
pub use self::lru::{CacheItem, CacheValue, LruTtlCache};
pub use self::tiered::{MultiTierCache, TieredCacheConfig};

/// Cache error types. Operations on the cache itself are infallible;
/// only pluggable codecs can report failure.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("codec error: {0}")]
    Codec(String),
}

/// Result type for cache codec operations
pub type CacheResult<T> = Result<T, CacheError>;

/// The three cache tiers, fastest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheLevel {
    L1,
    L2,
    L3,
}

/// Byte-size estimate used for cache accounting when the payload has no
/// specific figure.
pub const DEFAULT_SIZE_ESTIMATE: usize = 128;

/// Policy mapping payloads to an estimated byte size.
///
/// Strings and byte vectors report their length; domain types carry a
/// fixed documented figure; everything else defaults to
/// [`DEFAULT_SIZE_ESTIMATE`].
pub trait EstimateSize {
    fn estimate_size(&self) -> usize {
        DEFAULT_SIZE_ESTIMATE
    }
}

impl EstimateSize for String {
    fn estimate_size(&self) -> usize {
        self.len()
    }
}

impl EstimateSize for Vec<u8> {
    fn estimate_size(&self) -> usize {
        self.len()
    }
}

impl EstimateSize for crate::types::Transaction {
    fn estimate_size(&self) -> usize {
        256
    }
}

impl EstimateSize for crate::types::Block {
    fn estimate_size(&self) -> usize {
        1024
    }
}

impl EstimateSize for crate::utxo::Utxo {
    fn estimate_size(&self) -> usize {
        64
    }
}

/// Invertible byte-level codec behind the level-2 compression flag.
pub trait CompressionCodec: Send + Sync {
    fn compress(&self, data: &[u8]) -> Vec<u8>;
    fn decompress(&self, data: &[u8]) -> CacheResult<Vec<u8>>;
}

/// Identity codec: entries are tagged compressed and counted, bytes
/// pass through unchanged.
#[derive(Debug, Default)]
pub struct PassthroughCodec;

impl CompressionCodec for PassthroughCodec {
    fn compress(&self, data: &[u8]) -> Vec<u8> {
        data.to_vec()
    }

    fn decompress(&self, data: &[u8]) -> CacheResult<Vec<u8>> {
        Ok(data.to_vec())
    }
}

/// Atomic cache counters, shared across levels and sweeper tasks.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    compressions: AtomicU64,
    decompressions: AtomicU64,
    l1_hits: AtomicU64,
    l2_hits: AtomicU64,
    l3_hits: AtomicU64,
}

impl CacheStats {
    pub(crate) fn record_hit(&self, level: CacheLevel) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        match level {
            CacheLevel::L1 => self.l1_hits.fetch_add(1, Ordering::Relaxed),
            CacheLevel::L2 => self.l2_hits.fetch_add(1, Ordering::Relaxed),
            CacheLevel::L3 => self.l3_hits.fetch_add(1, Ordering::Relaxed),
        };
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_evictions(&self, count: u64) {
        if count > 0 {
            self.evictions.fetch_add(count, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_compression(&self) {
        self.compressions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_decompression(&self) {
        self.decompressions.fetch_add(1, Ordering::Relaxed);
    }

    /// Consistent-enough copy of all counters.
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            compressions: self.compressions.load(Ordering::Relaxed),
            decompressions: self.decompressions.load(Ordering::Relaxed),
            l1_hits: self.l1_hits.load(Ordering::Relaxed),
            l2_hits: self.l2_hits.load(Ordering::Relaxed),
            l3_hits: self.l3_hits.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of the cache counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub compressions: u64,
    pub decompressions: u64,
    pub l1_hits: u64,
    pub l2_hits: u64,
    pub l3_hits: u64,
}

impl CacheStatsSnapshot {
    /// Share of lookups answered from any level.
    pub fn hit_rate(&self) -> f64 {
        if self.hits + self.misses == 0 {
            0.0
        } else {
            self.hits as f64 / (self.hits + self.misses) as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_estimates() {
        assert_eq!("hello".to_string().estimate_size(), 5);
        assert_eq!(vec![0u8; 42].estimate_size(), 42);

        struct Opaque;
        impl EstimateSize for Opaque {}
        assert_eq!(Opaque.estimate_size(), DEFAULT_SIZE_ESTIMATE);
    }

    #[test]
    fn test_passthrough_codec_round_trip() {
        let codec = PassthroughCodec;
        let data = b"payload".to_vec();
        let compressed = codec.compress(&data);
        assert_eq!(codec.decompress(&compressed).unwrap(), data);
    }

    #[test]
    fn test_stats_counters() {
        let stats = CacheStats::default();
        stats.record_hit(CacheLevel::L1);
        stats.record_hit(CacheLevel::L3);
        stats.record_miss();
        stats.record_evictions(3);

        let snap = stats.snapshot();
        assert_eq!(snap.hits, 2);
        assert_eq!(snap.l1_hits, 1);
        assert_eq!(snap.l3_hits, 1);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.evictions, 3);
        assert!((snap.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
