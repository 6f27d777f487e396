//! Block Structures
//!
//! Blocks carry an ordered list of transactions; index 0 is the
//! coinbase that mints the block reward.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::Transaction;

/// Block header fields covered by the block hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: u32,
    pub prev_block_hash: [u8; 32],
    pub merkle_root: [u8; 32],
    /// Unix timestamp in seconds
    pub timestamp: u64,
    pub difficulty: u64,
    pub nonce: u64,
    pub height: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: BlockHeader, transactions: Vec<Transaction>) -> Self {
        Self {
            header,
            transactions,
        }
    }

    /// Content hash over the header. Total for every block.
    pub fn calculate_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.header.version.to_le_bytes());
        hasher.update(self.header.prev_block_hash);
        hasher.update(self.header.merkle_root);
        hasher.update(self.header.timestamp.to_le_bytes());
        hasher.update(self.header.difficulty.to_le_bytes());
        hasher.update(self.header.nonce.to_le_bytes());
        hasher.update(self.header.height.to_le_bytes());
        hasher.finalize().into()
    }

    /// Height stamped on UTXOs created by this block.
    pub fn height(&self) -> u64 {
        self.header.height
    }
}
