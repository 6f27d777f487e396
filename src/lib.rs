// Core modules
pub mod cache;
pub mod crypto;
pub mod processor;
pub mod types;
pub mod utxo;


// Re-export main types for easy access
pub use cache::{
    CacheError, CacheLevel, CacheStatsSnapshot, CompressionCodec, EstimateSize, LruTtlCache,
    MultiTierCache, PassthroughCodec, TieredCacheConfig,
};
pub use crypto::{CryptoError, CryptoUtils};
pub use processor::{
    ParallelProcessor, PriorityQueue, ProcessorConfig, ProcessorError, ProcessorStats, WorkItem,
    WorkKind, WorkPayload, WorkResult, WorkerStats,
};
pub use types::{Block, BlockHeader, Transaction, TxInput, TxOutput};
pub use utxo::{OutPoint, Utxo, UtxoSet, ValidationError, DUST_THRESHOLD};
