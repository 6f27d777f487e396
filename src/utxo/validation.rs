//! Transaction Validation
//!
//! Structural, cryptographic and economic checks a transaction must
//! pass against the current UTXO set, in both the permissive
//! standalone form and the strict in-block form, plus fee calculation
//! and fee-rate policy.

use rayon::prelude::*;

use crate::crypto::{parse_public_key, verify_signature, CryptoUtils};
use crate::types::{Block, Transaction};
use crate::utxo::{OutPoint, UtxoSet};

/// Smallest output value worth spending later.
pub const DUST_THRESHOLD: u64 = 546;

/// Minimum spend-authorization length: 65-byte uncompressed public key
/// plus 32-byte R and 32-byte S.
pub const MIN_SCRIPT_SIG_LEN: usize = 129;

/// Why a transaction or block was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("transaction has no inputs")]
    NoInputs,

    #[error("transaction has no outputs")]
    NoOutputs,

    #[error("input {index}: duplicate outpoint")]
    DuplicateInput { index: usize },

    #[error("input UTXO not found: {outpoint}")]
    UtxoNotFound { outpoint: OutPoint },

    #[error("input {index}: script_sig is {len} bytes, minimum is {MIN_SCRIPT_SIG_LEN}")]
    ScriptSigTooShort { index: usize, len: usize },

    #[error("input {index}: invalid public key: {reason}")]
    BadPubKey { index: usize, reason: String },

    #[error("input {index}: public key does not hash to the spent output's script")]
    PubKeyHashMismatch { index: usize },

    #[error("input {index}: signature components out of range")]
    BadSignatureComponents { index: usize },

    #[error("input {index}: signature verification failed")]
    BadSignature { index: usize },

    #[error("outputs ({outputs}) exceed inputs ({inputs})")]
    OutputsExceedInputs { inputs: u64, outputs: u64 },

    #[error("actual fee {actual} is below declared fee {declared}")]
    ActualFeeBelowDeclared { actual: u64, declared: u64 },

    #[error("fee {fee} exceeds half of input total {input_total}")]
    FeeTooHigh { fee: u64, input_total: u64 },

    #[error("output {index}: value {value} is below the dust threshold {DUST_THRESHOLD}")]
    DustOutput { index: usize, value: u64 },

    #[error("output {index}: zero value")]
    ZeroValueOutput { index: usize },

    #[error("output {index}: empty script_pub_key")]
    EmptyScriptPubKey { index: usize },

    #[error("declared fee {actual} is below the rate minimum {required}")]
    FeeRateTooLow { required: u64, actual: u64 },

    #[error("transaction {tx_index} output {output_index}: script_pub_key is {len} bytes, expected 20")]
    InvalidScriptPubKey {
        tx_index: usize,
        output_index: usize,
        len: usize,
    },

    #[error("transaction index {index} out of bounds for block of {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("coinbase transaction has {inputs} inputs, expected none")]
    CoinbaseHasInputs { inputs: usize },

    #[error("value overflow while summing transaction amounts")]
    ValueOverflow,

    #[error("transaction {index} rejected: {source}")]
    TransactionInvalid {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },
}

impl UtxoSet {
    /// Validate a transaction on its own.
    ///
    /// Any zero-input transaction is treated as a potential coinbase
    /// and only needs well-formed outputs; block context is required to
    /// pin a coinbase to index 0, see
    /// [`UtxoSet::validate_transaction_in_block`].
    pub fn validate_transaction(&self, tx: &Transaction) -> Result<(), ValidationError> {
        if tx.is_coinbase() {
            return validate_coinbase_outputs(tx);
        }
        self.validate_spend(tx)
    }

    /// Validate a transaction in its block position.
    ///
    /// The transaction at index 0 is the coinbase and must have no
    /// inputs; every other transaction must spend at least one input
    /// and passes the full spend checks.
    pub fn validate_transaction_in_block(
        &self,
        tx: &Transaction,
        block: &Block,
        index: usize,
    ) -> Result<(), ValidationError> {
        let len = block.transactions.len();
        if index >= len {
            return Err(ValidationError::IndexOutOfBounds { index, len });
        }

        if index == 0 && block.transactions[0] == *tx {
            if !tx.inputs.is_empty() {
                return Err(ValidationError::CoinbaseHasInputs {
                    inputs: tx.inputs.len(),
                });
            }
            return validate_coinbase_outputs(tx);
        }

        if tx.inputs.is_empty() {
            return Err(ValidationError::NoInputs);
        }
        self.validate_spend(tx)
    }

    /// Validate every transaction of a block in parallel, strict
    /// in-block rules. Returns the lowest failing index.
    pub fn validate_block_transactions(&self, block: &Block) -> Result<(), ValidationError> {
        let failure = block
            .transactions
            .par_iter()
            .enumerate()
            .find_map_first(|(index, tx)| {
                self.validate_transaction_in_block(tx, block, index)
                    .err()
                    .map(|source| ValidationError::TransactionInvalid {
                        index,
                        source: Box::new(source),
                    })
            });
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// True if any input of `tx` no longer exists in the set.
    pub fn is_double_spend(&self, tx: &Transaction) -> bool {
        let inner = self.inner.read();
        tx.inputs.iter().any(|input| {
            !inner
                .utxos
                .contains_key(&OutPoint::new(input.prev_tx_hash, input.prev_tx_index))
        })
    }

    /// Actual fee paid: input total minus output total. Zero for a
    /// coinbase. Fails when an input is missing or the outputs claim
    /// more than the inputs provide.
    pub fn calculate_fee(&self, tx: &Transaction) -> Result<u64, ValidationError> {
        if tx.is_coinbase() {
            return Ok(0);
        }

        let inner = self.inner.read();
        let mut input_total: u64 = 0;
        for input in &tx.inputs {
            let outpoint = OutPoint::new(input.prev_tx_hash, input.prev_tx_index);
            let utxo = inner
                .utxos
                .get(&outpoint)
                .ok_or(ValidationError::UtxoNotFound { outpoint })?;
            input_total = input_total
                .checked_add(utxo.value)
                .ok_or(ValidationError::ValueOverflow)?;
        }

        let output_total = sum_outputs(tx)?;
        if output_total > input_total {
            return Err(ValidationError::OutputsExceedInputs {
                inputs: input_total,
                outputs: output_total,
            });
        }
        Ok(input_total - output_total)
    }

    /// Enforce the minimum fee rate, in base units per kilobyte of
    /// serialized transaction. Coinbase transactions are exempt; the
    /// check gates the declared fee.
    pub fn validate_fee_rate(
        &self,
        tx: &Transaction,
        min_rate_per_kilobyte: u64,
    ) -> Result<(), ValidationError> {
        if tx.is_coinbase() {
            return Ok(());
        }
        let required = tx.encoded_size().saturating_mul(min_rate_per_kilobyte) / 1000;
        if tx.fee < required {
            return Err(ValidationError::FeeRateTooLow {
                required,
                actual: tx.fee,
            });
        }
        Ok(())
    }

    /// Full spend validation: structure, double-spend-free inputs,
    /// signatures over the spend digest, and the economic rules.
    fn validate_spend(&self, tx: &Transaction) -> Result<(), ValidationError> {
        if tx.outputs.is_empty() {
            return Err(ValidationError::NoOutputs);
        }

        let mut seen = std::collections::HashSet::with_capacity(tx.inputs.len());
        for (index, input) in tx.inputs.iter().enumerate() {
            if !seen.insert(OutPoint::new(input.prev_tx_hash, input.prev_tx_index)) {
                return Err(ValidationError::DuplicateInput { index });
            }
        }

        let digest = tx.signature_hash();
        let inner = self.inner.read();

        let mut input_total: u64 = 0;
        for (index, input) in tx.inputs.iter().enumerate() {
            let outpoint = OutPoint::new(input.prev_tx_hash, input.prev_tx_index);
            let utxo = inner
                .utxos
                .get(&outpoint)
                .ok_or(ValidationError::UtxoNotFound { outpoint })?;

            if input.script_sig.len() < MIN_SCRIPT_SIG_LEN {
                return Err(ValidationError::ScriptSigTooShort {
                    index,
                    len: input.script_sig.len(),
                });
            }

            let pubkey_bytes = &input.script_sig[..65];
            let public_key =
                parse_public_key(pubkey_bytes).map_err(|e| ValidationError::BadPubKey {
                    index,
                    reason: e.to_string(),
                })?;

            if CryptoUtils::pubkey_hash(pubkey_bytes) != utxo.script_pub_key {
                return Err(ValidationError::PubKeyHashMismatch { index });
            }

            let mut r = [0u8; 32];
            let mut s = [0u8; 32];
            r.copy_from_slice(&input.script_sig[65..97]);
            s.copy_from_slice(&input.script_sig[97..129]);
            if r == [0u8; 32] || s == [0u8; 32] {
                return Err(ValidationError::BadSignatureComponents { index });
            }

            match verify_signature(&public_key, &digest, &r, &s) {
                Ok(true) => {}
                Ok(false) => return Err(ValidationError::BadSignature { index }),
                Err(_) => return Err(ValidationError::BadSignatureComponents { index }),
            }

            input_total = input_total
                .checked_add(utxo.value)
                .ok_or(ValidationError::ValueOverflow)?;
        }
        drop(inner);

        for (index, output) in tx.outputs.iter().enumerate() {
            if output.script_pub_key.is_empty() {
                return Err(ValidationError::EmptyScriptPubKey { index });
            }
        }
        let output_total = sum_outputs(tx)?;

        if output_total > input_total {
            return Err(ValidationError::OutputsExceedInputs {
                inputs: input_total,
                outputs: output_total,
            });
        }

        let actual_fee = input_total - output_total;
        if actual_fee < tx.fee {
            return Err(ValidationError::ActualFeeBelowDeclared {
                actual: actual_fee,
                declared: tx.fee,
            });
        }

        // A fee above half the input total is assumed to be a mistake.
        if (actual_fee as u128) * 2 > input_total as u128 {
            return Err(ValidationError::FeeTooHigh {
                fee: actual_fee,
                input_total,
            });
        }

        for (index, output) in tx.outputs.iter().enumerate() {
            if output.value < DUST_THRESHOLD {
                return Err(ValidationError::DustOutput {
                    index,
                    value: output.value,
                });
            }
        }

        Ok(())
    }
}

/// Output rules for a zero-input transaction: at least one output,
/// every output funded and locked.
fn validate_coinbase_outputs(tx: &Transaction) -> Result<(), ValidationError> {
    if tx.outputs.is_empty() {
        return Err(ValidationError::NoOutputs);
    }
    for (index, output) in tx.outputs.iter().enumerate() {
        if output.value == 0 {
            return Err(ValidationError::ZeroValueOutput { index });
        }
        if output.script_pub_key.is_empty() {
            return Err(ValidationError::EmptyScriptPubKey { index });
        }
    }
    Ok(())
}

fn sum_outputs(tx: &Transaction) -> Result<u64, ValidationError> {
    let mut total: u64 = 0;
    for output in &tx.outputs {
        total = total
            .checked_add(output.value)
            .ok_or(ValidationError::ValueOverflow)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlockHeader, TxInput, TxOutput};
    use crate::utxo::Utxo;
    use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};

    struct Wallet {
        secret: SecretKey,
        public: PublicKey,
    }

    impl Wallet {
        fn new(seed: u8) -> Self {
            let secp = Secp256k1::new();
            let secret = SecretKey::from_slice(&[seed; 32]).unwrap();
            let public = secret.public_key(&secp);
            Self { secret, public }
        }

        fn script_pub_key(&self) -> [u8; 20] {
            CryptoUtils::pubkey_hash(&self.public.serialize_uncompressed())
        }

        /// Build a fully signed spend of the given outpoints.
        fn spend(
            &self,
            prev: &[([u8; 32], u32)],
            outputs: Vec<TxOutput>,
            fee: u64,
        ) -> Transaction {
            let inputs: Vec<TxInput> = prev
                .iter()
                .map(|(hash, index)| TxInput {
                    prev_tx_hash: *hash,
                    prev_tx_index: *index,
                    script_sig: vec![],
                    sequence: 0xffff_ffff,
                })
                .collect();
            let unsigned = Transaction::new(1, inputs.clone(), outputs.clone(), 0, fee);
            let digest = unsigned.signature_hash();

            let secp = Secp256k1::new();
            let message = Message::from_digest_slice(&digest).unwrap();
            let compact = secp.sign_ecdsa(&message, &self.secret).serialize_compact();

            let mut script_sig = Vec::with_capacity(129);
            script_sig.extend_from_slice(&self.public.serialize_uncompressed());
            script_sig.extend_from_slice(&compact);

            let signed: Vec<TxInput> = inputs
                .into_iter()
                .map(|mut input| {
                    input.script_sig = script_sig.clone();
                    input
                })
                .collect();
            Transaction::new(1, signed, outputs, 0, fee)
        }
    }

    fn funded_set(wallet: &Wallet, value: u64) -> (UtxoSet, [u8; 32]) {
        let set = UtxoSet::new();
        let tx_hash = [0x77; 32];
        set.add_utxo(Utxo::new(tx_hash, 0, value, wallet.script_pub_key(), false, 1));
        (set, tx_hash)
    }

    fn pay(value: u64, script: [u8; 20]) -> TxOutput {
        TxOutput {
            value,
            script_pub_key: script.to_vec(),
        }
    }

    #[test]
    fn test_valid_spend_passes() {
        let wallet = Wallet::new(7);
        let (set, tx_hash) = funded_set(&wallet, 10_000);
        let tx = wallet.spend(
            &[(tx_hash, 0)],
            vec![pay(9_000, wallet.script_pub_key())],
            1_000,
        );
        set.validate_transaction(&tx).unwrap();
        assert_eq!(set.calculate_fee(&tx).unwrap(), 1_000);
    }

    #[test]
    fn test_dust_boundary() {
        let wallet = Wallet::new(7);
        let (set, tx_hash) = funded_set(&wallet, 10_000);

        let at_threshold = wallet.spend(
            &[(tx_hash, 0)],
            vec![pay(546, wallet.script_pub_key()), pay(9_000, wallet.script_pub_key())],
            0,
        );
        set.validate_transaction(&at_threshold).unwrap();

        let below = wallet.spend(
            &[(tx_hash, 0)],
            vec![pay(545, wallet.script_pub_key()), pay(9_001, wallet.script_pub_key())],
            0,
        );
        let err = set.validate_transaction(&below).unwrap_err();
        assert!(matches!(err, ValidationError::DustOutput { index: 0, value: 545 }));
    }

    #[test]
    fn test_fee_half_boundary() {
        let wallet = Wallet::new(7);
        let (set, tx_hash) = funded_set(&wallet, 10_000);

        // Fee of exactly half the inputs is the maximum accepted.
        let at_half = wallet.spend(
            &[(tx_hash, 0)],
            vec![pay(5_000, wallet.script_pub_key())],
            5_000,
        );
        set.validate_transaction(&at_half).unwrap();

        let over_half = wallet.spend(
            &[(tx_hash, 0)],
            vec![pay(4_999, wallet.script_pub_key())],
            5_001,
        );
        let err = set.validate_transaction(&over_half).unwrap_err();
        assert!(matches!(err, ValidationError::FeeTooHigh { fee: 5_001, .. }));
    }

    #[test]
    fn test_duplicate_input_rejected() {
        let wallet = Wallet::new(7);
        let (set, tx_hash) = funded_set(&wallet, 10_000);
        let tx = wallet.spend(
            &[(tx_hash, 0), (tx_hash, 0)],
            vec![pay(9_000, wallet.script_pub_key())],
            0,
        );
        let err = set.validate_transaction(&tx).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateInput { index: 1 }));
    }

    #[test]
    fn test_missing_utxo_rejected() {
        let wallet = Wallet::new(7);
        let (set, _) = funded_set(&wallet, 10_000);
        let tx = wallet.spend(&[([0x01; 32], 5)], vec![pay(600, wallet.script_pub_key())], 0);
        let err = set.validate_transaction(&tx).unwrap_err();
        // The message names the offending outpoint.
        assert!(err.to_string().ends_with(":5"));
        match err {
            ValidationError::UtxoNotFound { outpoint } => {
                assert_eq!(outpoint, OutPoint::new([0x01; 32], 5));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_short_script_sig_rejected() {
        let wallet = Wallet::new(7);
        let (set, tx_hash) = funded_set(&wallet, 10_000);
        let mut tx = wallet.spend(&[(tx_hash, 0)], vec![pay(9_000, wallet.script_pub_key())], 0);
        tx.inputs[0].script_sig.truncate(128);
        let err = set.validate_transaction(&tx).unwrap_err();
        assert!(matches!(err, ValidationError::ScriptSigTooShort { len: 128, .. }));
    }

    #[test]
    fn test_exactly_minimum_script_sig_accepted() {
        let wallet = Wallet::new(7);
        let (set, tx_hash) = funded_set(&wallet, 10_000);
        let tx = wallet.spend(&[(tx_hash, 0)], vec![pay(9_000, wallet.script_pub_key())], 0);
        assert_eq!(tx.inputs[0].script_sig.len(), MIN_SCRIPT_SIG_LEN);
        set.validate_transaction(&tx).unwrap();
    }

    #[test]
    fn test_wrong_key_rejected() {
        let owner = Wallet::new(7);
        let thief = Wallet::new(9);
        let (set, tx_hash) = funded_set(&owner, 10_000);
        // Signed by a key whose hash does not match the spent output.
        let tx = thief.spend(&[(tx_hash, 0)], vec![pay(9_000, thief.script_pub_key())], 0);
        let err = set.validate_transaction(&tx).unwrap_err();
        assert!(matches!(err, ValidationError::PubKeyHashMismatch { index: 0 }));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let wallet = Wallet::new(7);
        let (set, tx_hash) = funded_set(&wallet, 10_000);
        let mut tx = wallet.spend(&[(tx_hash, 0)], vec![pay(9_000, wallet.script_pub_key())], 0);
        // Different amount than the one that was signed.
        tx.outputs[0].value = 8_000;
        tx.hash = tx.calculate_hash();
        let err = set.validate_transaction(&tx).unwrap_err();
        assert!(matches!(err, ValidationError::BadSignature { index: 0 }));
    }

    #[test]
    fn test_zero_signature_components_rejected() {
        let wallet = Wallet::new(7);
        let (set, tx_hash) = funded_set(&wallet, 10_000);
        let mut tx = wallet.spend(&[(tx_hash, 0)], vec![pay(9_000, wallet.script_pub_key())], 0);
        for byte in &mut tx.inputs[0].script_sig[65..97] {
            *byte = 0;
        }
        let err = set.validate_transaction(&tx).unwrap_err();
        assert!(matches!(err, ValidationError::BadSignatureComponents { index: 0 }));
    }

    #[test]
    fn test_garbage_public_key_rejected() {
        let wallet = Wallet::new(7);
        let (set, tx_hash) = funded_set(&wallet, 10_000);
        let mut tx = wallet.spend(&[(tx_hash, 0)], vec![pay(9_000, wallet.script_pub_key())], 0);
        tx.inputs[0].script_sig[0] = 0x01; // not a valid uncompressed prefix
        let err = set.validate_transaction(&tx).unwrap_err();
        assert!(matches!(err, ValidationError::BadPubKey { index: 0, .. }));
    }

    #[test]
    fn test_outputs_exceeding_inputs_rejected() {
        let wallet = Wallet::new(7);
        let (set, tx_hash) = funded_set(&wallet, 1_000);
        let tx = wallet.spend(&[(tx_hash, 0)], vec![pay(2_000, wallet.script_pub_key())], 0);
        let err = set.validate_transaction(&tx).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::OutputsExceedInputs { inputs: 1_000, outputs: 2_000 }
        ));
    }

    #[test]
    fn test_declared_fee_above_actual_rejected() {
        let wallet = Wallet::new(7);
        let (set, tx_hash) = funded_set(&wallet, 10_000);
        let tx = wallet.spend(
            &[(tx_hash, 0)],
            vec![pay(9_500, wallet.script_pub_key())],
            1_000, // only 500 actually left over
        );
        let err = set.validate_transaction(&tx).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::ActualFeeBelowDeclared { actual: 500, declared: 1_000 }
        ));
    }

    #[test]
    fn test_permissive_coinbase() {
        let set = UtxoSet::new();
        let coinbase = Transaction::new(1, vec![], vec![pay(50, [0x29; 20])], 0, 0);
        set.validate_transaction(&coinbase).unwrap();

        let zero_value = Transaction::new(1, vec![], vec![pay(0, [0x29; 20])], 0, 0);
        assert!(matches!(
            set.validate_transaction(&zero_value).unwrap_err(),
            ValidationError::ZeroValueOutput { index: 0 }
        ));

        let no_outputs = Transaction::new(1, vec![], vec![], 0, 0);
        assert!(matches!(
            set.validate_transaction(&no_outputs).unwrap_err(),
            ValidationError::NoOutputs
        ));
    }

    fn block_with(transactions: Vec<Transaction>, height: u64) -> Block {
        Block::new(
            BlockHeader {
                version: 1,
                prev_block_hash: [0u8; 32],
                merkle_root: [0u8; 32],
                timestamp: 1_700_000_000,
                difficulty: 1,
                nonce: 0,
                height,
            },
            transactions,
        )
    }

    #[test]
    fn test_in_block_rules() {
        let wallet = Wallet::new(7);
        let (set, tx_hash) = funded_set(&wallet, 10_000);

        let coinbase = Transaction::new(1, vec![], vec![pay(50, [0x29; 20])], 0, 0);
        let spend = wallet.spend(&[(tx_hash, 0)], vec![pay(9_000, wallet.script_pub_key())], 1_000);
        let block = block_with(vec![coinbase.clone(), spend.clone()], 2);

        set.validate_transaction_in_block(&coinbase, &block, 0).unwrap();
        set.validate_transaction_in_block(&spend, &block, 1).unwrap();

        // A zero-input transaction is not permitted outside index 0.
        let stray_mint = Transaction::new(1, vec![], vec![pay(600, [0x30; 20])], 0, 0);
        let block2 = block_with(vec![coinbase.clone(), stray_mint.clone()], 2);
        assert!(matches!(
            set.validate_transaction_in_block(&stray_mint, &block2, 1).unwrap_err(),
            ValidationError::NoInputs
        ));

        assert!(matches!(
            set.validate_transaction_in_block(&coinbase, &block, 5).unwrap_err(),
            ValidationError::IndexOutOfBounds { index: 5, len: 2 }
        ));

        let fat_coinbase = wallet.spend(&[(tx_hash, 0)], vec![pay(9_000, wallet.script_pub_key())], 1_000);
        let block3 = block_with(vec![fat_coinbase.clone()], 2);
        assert!(matches!(
            set.validate_transaction_in_block(&fat_coinbase, &block3, 0).unwrap_err(),
            ValidationError::CoinbaseHasInputs { inputs: 1 }
        ));
    }

    #[test]
    fn test_validate_block_transactions_reports_first_failure() {
        let wallet = Wallet::new(7);
        let (set, tx_hash) = funded_set(&wallet, 10_000);

        let coinbase = Transaction::new(1, vec![], vec![pay(50, [0x29; 20])], 0, 0);
        let good = wallet.spend(&[(tx_hash, 0)], vec![pay(9_000, wallet.script_pub_key())], 1_000);
        let bad = wallet.spend(&[([0x02; 32], 0)], vec![pay(600, wallet.script_pub_key())], 0);

        let ok_block = block_with(vec![coinbase.clone(), good.clone()], 2);
        set.validate_block_transactions(&ok_block).unwrap();

        let bad_block = block_with(vec![coinbase, bad, good], 2);
        let err = set.validate_block_transactions(&bad_block).unwrap_err();
        assert!(matches!(err, ValidationError::TransactionInvalid { index: 1, .. }));
    }

    #[test]
    fn test_double_spend_detection() {
        let wallet = Wallet::new(7);
        let (set, tx_hash) = funded_set(&wallet, 10_000);
        let tx = wallet.spend(&[(tx_hash, 0)], vec![pay(9_000, wallet.script_pub_key())], 1_000);

        assert!(!set.is_double_spend(&tx));
        set.remove_utxo(tx_hash, 0);
        assert!(set.is_double_spend(&tx));
        assert!(matches!(
            set.validate_transaction(&tx).unwrap_err(),
            ValidationError::UtxoNotFound { .. }
        ));
    }

    #[test]
    fn test_calculate_fee_coinbase_is_zero() {
        let set = UtxoSet::new();
        let coinbase = Transaction::new(1, vec![], vec![pay(50, [0x29; 20])], 0, 0);
        assert_eq!(set.calculate_fee(&coinbase).unwrap(), 0);
    }

    #[test]
    fn test_fee_rate_policy() {
        let set = UtxoSet::new();
        // 1 input with a 160-byte script_sig and 1 standard output:
        // 4 + 1 + (32+4+160+4) + 1 + (8+20) + 8 + 8 = 250 bytes.
        let tx = Transaction::new(
            1,
            vec![TxInput {
                prev_tx_hash: [0x01; 32],
                prev_tx_index: 0,
                script_sig: vec![0u8; 160],
                sequence: 0,
            }],
            vec![pay(600, [0x29; 20])],
            0,
            100,
        );
        assert_eq!(tx.encoded_size(), 250);

        // 1000 per kilobyte over 250 bytes requires a fee of 250.
        let err = set.validate_fee_rate(&tx, 1_000).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::FeeRateTooLow { required: 250, actual: 100 }
        ));

        // 100 per kilobyte only requires 25.
        set.validate_fee_rate(&tx, 100).unwrap();

        // Coinbase is exempt at any rate.
        let coinbase = Transaction::new(1, vec![], vec![pay(50, [0x29; 20])], 0, 0);
        set.validate_fee_rate(&coinbase, u64::MAX).unwrap();
    }
}
