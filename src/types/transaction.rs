//! Core Transaction Structures
//!
//! Defines transactions, their inputs and outputs, the content hash,
//! the deterministic size used by fee-rate policy, and the digest that
//! spend signatures commit to.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A reference to a previous output together with the payload that
/// authorizes spending it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Hash of the transaction that produced the output being spent
    pub prev_tx_hash: [u8; 32],
    /// Output index within that transaction
    pub prev_tx_index: u32,
    /// Spend authorization: 65-byte uncompressed public key followed by
    /// a 64-byte signature (big-endian R then S)
    pub script_sig: Vec<u8>,
    /// Sequence number
    pub sequence: u32,
}

/// A new output created by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    /// Amount in base units
    pub value: u64,
    /// Locking payload, a 20-byte public-key hash for standard outputs
    pub script_pub_key: Vec<u8>,
}

/// A transfer of value consuming existing unspent outputs and creating
/// new ones. A transaction with no inputs is a coinbase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
    pub lock_time: u64,
    /// Fee the submitter claims to pay
    pub fee: u64,
    /// Content hash, fixed at construction
    pub hash: [u8; 32],
}

impl Transaction {
    /// Create a transaction and stamp it with its content hash.
    pub fn new(
        version: u32,
        inputs: Vec<TxInput>,
        outputs: Vec<TxOutput>,
        lock_time: u64,
        fee: u64,
    ) -> Self {
        let mut tx = Self {
            version,
            inputs,
            outputs,
            lock_time,
            fee,
            hash: [0u8; 32],
        };
        tx.hash = tx.calculate_hash();
        tx
    }

    /// Compute the content hash over every field of the transaction.
    pub fn calculate_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.version.to_le_bytes());
        hasher.update((self.inputs.len() as u64).to_le_bytes());
        for input in &self.inputs {
            hasher.update(input.prev_tx_hash);
            hasher.update(input.prev_tx_index.to_le_bytes());
            hasher.update(&input.script_sig);
            hasher.update(input.sequence.to_le_bytes());
        }
        hasher.update((self.outputs.len() as u64).to_le_bytes());
        for output in &self.outputs {
            hasher.update(output.value.to_le_bytes());
            hasher.update(&output.script_pub_key);
        }
        hasher.update(self.lock_time.to_le_bytes());
        hasher.update(self.fee.to_le_bytes());
        hasher.finalize().into()
    }

    /// True if this transaction mints value rather than spending it.
    pub fn is_coinbase(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Serialized size in bytes for fee-rate purposes.
    ///
    /// Layout: version(4) + input count(1) + per input
    /// (prev hash 32 + index 4 + script_sig + sequence 4) + output
    /// count(1) + per output (value 8 + script_pub_key) + lock_time(8)
    /// + fee(8). The two count fields are a single byte each.
    pub fn encoded_size(&self) -> u64 {
        let inputs: u64 = self
            .inputs
            .iter()
            .map(|i| 32 + 4 + i.script_sig.len() as u64 + 4)
            .sum();
        let outputs: u64 = self
            .outputs
            .iter()
            .map(|o| 8 + o.script_pub_key.len() as u64)
            .sum();
        4 + 1 + inputs + 1 + outputs + 8 + 8
    }

    /// Digest that spend signatures commit to.
    ///
    /// Only the low byte of each multi-byte integer is folded into the
    /// preimage. Every existing signature commits to this exact
    /// encoding, so it must not change.
    pub fn signature_hash(&self) -> [u8; 32] {
        let mut preimage = Vec::with_capacity(64);
        preimage.push(self.version as u8);
        for input in &self.inputs {
            preimage.extend_from_slice(&input.prev_tx_hash);
            preimage.push(input.prev_tx_index as u8);
            preimage.push(input.sequence as u8);
        }
        for output in &self.outputs {
            preimage.push(output.value as u8);
            preimage.extend_from_slice(&output.script_pub_key);
        }
        preimage.push(self.lock_time as u8);
        preimage.push(self.fee as u8);
        Sha256::digest(&preimage).into()
    }

    /// Total value claimed by the outputs.
    pub fn total_output_value(&self) -> u64 {
        self.outputs.iter().map(|o| o.value).sum()
    }
}
