//! Core UTXO Data Structures
//! Defines the unspent output record and its identity key

use serde::{Deserialize, Serialize};

use crate::crypto::{CryptoUtils, PUBKEY_HASH_LEN};

/// Identity of a UTXO inside the set: producing transaction plus output
/// index. No two UTXOs share an outpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_hash: [u8; 32],
    pub index: u32,
}

impl OutPoint {
    pub fn new(tx_hash: [u8; 32], index: u32) -> Self {
        Self { tx_hash, index }
    }
}

impl std::fmt::Display for OutPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", hex::encode(self.tx_hash), self.index)
    }
}

/// One unspent transaction output.
///
/// `address` is always the lowercase hex of `script_pub_key`; the
/// constructor derives it so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Hash of the producing transaction
    pub tx_hash: [u8; 32],
    /// Output index within the producing transaction
    pub tx_index: u32,
    /// Amount in base units
    pub value: u64,
    /// 20-byte public-key hash the output locks to
    pub script_pub_key: [u8; PUBKEY_HASH_LEN],
    /// Hex encoding of `script_pub_key`
    pub address: String,
    /// True if minted by a zero-input transaction
    pub is_coinbase: bool,
    /// Block height at creation
    pub height: u64,
}

impl Utxo {
    /// Create a UTXO, deriving the address from the locking script.
    pub fn new(
        tx_hash: [u8; 32],
        tx_index: u32,
        value: u64,
        script_pub_key: [u8; PUBKEY_HASH_LEN],
        is_coinbase: bool,
        height: u64,
    ) -> Self {
        Self {
            tx_hash,
            tx_index,
            value,
            script_pub_key,
            address: CryptoUtils::to_hex(&script_pub_key),
            is_coinbase,
            height,
        }
    }

    /// Identity key of this UTXO in the set.
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.tx_hash, self.tx_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_derived_from_script() {
        let utxo = Utxo::new([0xab; 32], 3, 5000, [0x29; 20], false, 10);
        assert_eq!(utxo.address, hex::encode([0x29; 20]));
        assert_eq!(utxo.outpoint(), OutPoint::new([0xab; 32], 3));
    }

    #[test]
    fn test_outpoint_display_is_hash_colon_index() {
        let outpoint = OutPoint::new([0x01; 32], 7);
        let rendered = outpoint.to_string();
        assert!(rendered.starts_with("0101"));
        assert!(rendered.ends_with(":7"));
    }
}
