//! UTXO Set with Balance Index
//!
//! Authoritative in-memory set of spendable outputs plus a per-address
//! balance index kept in lockstep. One reader-writer lock protects
//! both, so readers always observe a UTXO together with its balance
//! contribution.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::crypto::PUBKEY_HASH_LEN;
use crate::types::Block;
use crate::utxo::validation::ValidationError;
use crate::utxo::{OutPoint, Utxo};

#[derive(Debug, Default)]
pub(crate) struct UtxoSetInner {
    pub(crate) utxos: HashMap<OutPoint, Utxo>,
    /// address -> total value. An address with zero balance is absent.
    pub(crate) balances: HashMap<String, u64>,
}

impl UtxoSetInner {
    /// Insert a UTXO and credit its address. Replacing an existing
    /// entry first debits the value it contributed.
    pub(crate) fn insert(&mut self, utxo: Utxo) {
        if let Some(previous) = self.utxos.insert(utxo.outpoint(), utxo.clone()) {
            Self::debit(&mut self.balances, &previous.address, previous.value);
        }
        *self.balances.entry(utxo.address).or_insert(0) += utxo.value;
    }

    /// Remove a UTXO and debit its address, dropping the address from
    /// the index when its balance reaches zero.
    pub(crate) fn take(&mut self, outpoint: &OutPoint) -> Option<Utxo> {
        let utxo = self.utxos.remove(outpoint)?;
        Self::debit(&mut self.balances, &utxo.address, utxo.value);
        Some(utxo)
    }

    fn debit(balances: &mut HashMap<String, u64>, address: &str, value: u64) {
        if let Some(balance) = balances.get_mut(address) {
            *balance = balance.saturating_sub(value);
            if *balance == 0 {
                balances.remove(address);
            }
        }
    }
}

/// The unspent-output ledger.
///
/// All mutation goes through [`UtxoSet::add_utxo`],
/// [`UtxoSet::remove_utxo`] and [`UtxoSet::apply_block`]; every reader
/// sees UTXOs and balances move atomically.
#[derive(Debug, Default)]
pub struct UtxoSet {
    pub(crate) inner: RwLock<UtxoSetInner>,
}

impl UtxoSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a UTXO, updating the balance index.
    pub fn add_utxo(&self, utxo: Utxo) {
        self.inner.write().insert(utxo);
    }

    /// Remove and return a UTXO, updating the balance index.
    pub fn remove_utxo(&self, tx_hash: [u8; 32], tx_index: u32) -> Option<Utxo> {
        self.inner.write().take(&OutPoint::new(tx_hash, tx_index))
    }

    /// Look up a UTXO without mutating the set.
    pub fn get_utxo(&self, tx_hash: [u8; 32], tx_index: u32) -> Option<Utxo> {
        self.inner
            .read()
            .utxos
            .get(&OutPoint::new(tx_hash, tx_index))
            .cloned()
    }

    /// Balance of an address; 0 when unknown.
    pub fn get_balance(&self, address: &str) -> u64 {
        self.inner.read().balances.get(address).copied().unwrap_or(0)
    }

    /// All UTXOs locked to an address, in no particular order.
    pub fn get_address_utxos(&self, address: &str) -> Vec<Utxo> {
        self.inner
            .read()
            .utxos
            .values()
            .filter(|u| u.address == address)
            .cloned()
            .collect()
    }

    /// UTXOs of an address with at least `min_value`.
    pub fn get_spendable_utxos(&self, address: &str, min_value: u64) -> Vec<Utxo> {
        self.inner
            .read()
            .utxos
            .values()
            .filter(|u| u.address == address && u.value >= min_value)
            .cloned()
            .collect()
    }

    /// Number of unspent outputs.
    pub fn len(&self) -> usize {
        self.inner.read().utxos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().utxos.is_empty()
    }

    /// Sum of all unspent values. Always equals the sum of all balances.
    pub fn total_value(&self) -> u64 {
        self.inner.read().utxos.values().map(|u| u.value).sum()
    }

    /// Number of addresses currently holding funds.
    pub fn address_count(&self) -> usize {
        self.inner.read().balances.len()
    }

    /// Apply every transaction of a block in order under one exclusive
    /// lock: spent inputs leave the set, new outputs enter it stamped
    /// with the block height.
    ///
    /// Stops at the first missing input or malformed output and returns
    /// the error; state mutated before the failure stays applied, and
    /// recovery is the caller's responsibility.
    pub fn apply_block(&self, block: &Block) -> Result<(), ValidationError> {
        let height = block.height();
        let mut inner = self.inner.write();

        for (tx_position, tx) in block.transactions.iter().enumerate() {
            // Coinbase transactions have no inputs to consume.
            for input in &tx.inputs {
                let outpoint = OutPoint::new(input.prev_tx_hash, input.prev_tx_index);
                inner
                    .take(&outpoint)
                    .ok_or(ValidationError::UtxoNotFound { outpoint })?;
            }

            let is_coinbase = tx.is_coinbase();
            for (output_index, output) in tx.outputs.iter().enumerate() {
                let script: [u8; PUBKEY_HASH_LEN] =
                    output.script_pub_key.as_slice().try_into().map_err(|_| {
                        ValidationError::InvalidScriptPubKey {
                            tx_index: tx_position,
                            output_index,
                            len: output.script_pub_key.len(),
                        }
                    })?;
                inner.insert(Utxo::new(
                    tx.hash,
                    output_index as u32,
                    output.value,
                    script,
                    is_coinbase,
                    height,
                ));
            }
        }

        log::debug!(
            "applied block height={} txs={} utxos={}",
            height,
            block.transactions.len(),
            inner.utxos.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlockHeader, Transaction, TxInput, TxOutput};

    fn utxo(tx_hash: [u8; 32], index: u32, value: u64, script: [u8; 20]) -> Utxo {
        Utxo::new(tx_hash, index, value, script, false, 1)
    }

    fn header_at(height: u64) -> BlockHeader {
        BlockHeader {
            version: 1,
            prev_block_hash: [0u8; 32],
            merkle_root: [0u8; 32],
            timestamp: 1_700_000_000,
            difficulty: 1,
            nonce: 0,
            height,
        }
    }

    #[test]
    fn test_add_get_remove_round_trip() {
        let set = UtxoSet::new();
        let u = utxo([1; 32], 0, 5000, [0x29; 20]);
        let address = u.address.clone();

        set.add_utxo(u.clone());
        assert_eq!(set.len(), 1);
        assert_eq!(set.get_utxo([1; 32], 0), Some(u.clone()));
        assert_eq!(set.get_balance(&address), 5000);

        let removed = set.remove_utxo([1; 32], 0);
        assert_eq!(removed, Some(u));
        assert!(set.is_empty());
        assert_eq!(set.get_balance(&address), 0);
        // Zero-balance addresses leave the index entirely.
        assert_eq!(set.address_count(), 0);
    }

    #[test]
    fn test_balance_tracks_multiple_utxos() {
        let set = UtxoSet::new();
        let script = [0x29; 20];
        set.add_utxo(utxo([1; 32], 0, 1000, script));
        set.add_utxo(utxo([1; 32], 1, 2000, script));
        set.add_utxo(utxo([2; 32], 0, 4000, [0x30; 20]));

        let address = hex::encode(script);
        assert_eq!(set.get_balance(&address), 3000);
        assert_eq!(set.get_address_utxos(&address).len(), 2);
        assert_eq!(set.total_value(), 7000);
        assert_eq!(set.address_count(), 2);

        set.remove_utxo([1; 32], 0);
        assert_eq!(set.get_balance(&address), 2000);
        assert_eq!(set.address_count(), 2);
    }

    #[test]
    fn test_reinserting_outpoint_replaces_value() {
        let set = UtxoSet::new();
        let script = [0x29; 20];
        set.add_utxo(utxo([1; 32], 0, 1000, script));
        set.add_utxo(utxo([1; 32], 0, 250, script));

        assert_eq!(set.len(), 1);
        assert_eq!(set.get_balance(&hex::encode(script)), 250);
        assert_eq!(set.total_value(), 250);
    }

    #[test]
    fn test_spendable_filter() {
        let set = UtxoSet::new();
        let script = [0x29; 20];
        set.add_utxo(utxo([1; 32], 0, 100, script));
        set.add_utxo(utxo([1; 32], 1, 600, script));
        set.add_utxo(utxo([1; 32], 2, 546, script));

        let address = hex::encode(script);
        let spendable = set.get_spendable_utxos(&address, 546);
        assert_eq!(spendable.len(), 2);
        assert!(spendable.iter().all(|u| u.value >= 546));
    }

    #[test]
    fn test_unknown_address_has_zero_balance() {
        let set = UtxoSet::new();
        assert_eq!(set.get_balance("ffff"), 0);
        assert!(set.get_address_utxos("ffff").is_empty());
    }

    #[test]
    fn test_apply_block_spends_and_creates() {
        let set = UtxoSet::new();
        let coinbase = Transaction::new(
            1,
            vec![],
            vec![TxOutput {
                value: 50,
                script_pub_key: vec![0x29; 20],
            }],
            0,
            0,
        );
        let block = Block::new(header_at(1), vec![coinbase.clone()]);
        set.apply_block(&block).unwrap();

        let minted = set.get_utxo(coinbase.hash, 0).unwrap();
        assert!(minted.is_coinbase);
        assert_eq!(minted.height, 1);

        let spend = Transaction::new(
            1,
            vec![TxInput {
                prev_tx_hash: coinbase.hash,
                prev_tx_index: 0,
                script_sig: vec![0u8; 129],
                sequence: 0,
            }],
            vec![
                TxOutput {
                    value: 30,
                    script_pub_key: vec![0x30; 20],
                },
                TxOutput {
                    value: 15,
                    script_pub_key: vec![0x29; 20],
                },
            ],
            0,
            5,
        );
        let block2 = Block::new(header_at(2), vec![spend.clone()]);
        set.apply_block(&block2).unwrap();

        assert!(set.get_utxo(coinbase.hash, 0).is_none());
        assert_eq!(set.get_balance(&hex::encode([0x30; 20])), 30);
        assert_eq!(set.get_balance(&hex::encode([0x29; 20])), 15);
        assert!(!set.get_utxo(spend.hash, 0).unwrap().is_coinbase);
        assert_eq!(set.get_utxo(spend.hash, 1).unwrap().height, 2);
    }

    #[test]
    fn test_apply_block_missing_input_fails() {
        let set = UtxoSet::new();
        let spend = Transaction::new(
            1,
            vec![TxInput {
                prev_tx_hash: [9; 32],
                prev_tx_index: 0,
                script_sig: vec![0u8; 129],
                sequence: 0,
            }],
            vec![TxOutput {
                value: 10,
                script_pub_key: vec![0x29; 20],
            }],
            0,
            0,
        );
        let block = Block::new(header_at(1), vec![spend]);
        let err = set.apply_block(&block).unwrap_err();
        assert!(matches!(err, ValidationError::UtxoNotFound { .. }));
    }

    #[test]
    fn test_apply_block_rejects_malformed_script_width() {
        let set = UtxoSet::new();
        let bad = Transaction::new(
            1,
            vec![],
            vec![TxOutput {
                value: 50,
                script_pub_key: vec![0x29; 3],
            }],
            0,
            0,
        );
        let block = Block::new(header_at(1), vec![bad]);
        let err = set.apply_block(&block).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::InvalidScriptPubKey { len: 3, .. }
        ));
    }
}
