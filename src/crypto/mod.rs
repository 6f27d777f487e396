//! Cryptographic Primitives Module
//!
//! SHA-256 hashing, public-key-hash derivation and hex helpers, plus
//! secp256k1 signature verification in the `signatures` submodule.

use sha2::{Digest, Sha256};

pub mod signatures;

// Re-export main types
pub use signatures::{parse_public_key, verify_signature};

/// Cryptographic error types
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Number of bytes in a public-key hash
pub const PUBKEY_HASH_LEN: usize = 20;

/// Cryptographic utilities
pub struct CryptoUtils;

impl CryptoUtils {
    /// Hash data with SHA-256
    pub fn sha256(data: &[u8]) -> [u8; 32] {
        Sha256::digest(data).into()
    }

    /// Derive the 20-byte hash an output locks to: the last 20 bytes of
    /// SHA-256 over the serialized public key.
    pub fn pubkey_hash(public_key: &[u8]) -> [u8; PUBKEY_HASH_LEN] {
        let digest = Self::sha256(public_key);
        let mut hash = [0u8; PUBKEY_HASH_LEN];
        hash.copy_from_slice(&digest[32 - PUBKEY_HASH_LEN..]);
        hash
    }

    /// Convert bytes to lowercase hex string
    pub fn to_hex(bytes: &[u8]) -> String {
        hex::encode(bytes)
    }

    /// Convert hex string to bytes
    pub fn from_hex(hex_str: &str) -> CryptoResult<Vec<u8>> {
        hex::decode(hex_str).map_err(|e| CryptoError::SerializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256() {
        let digest = CryptoUtils::sha256(b"abc");
        assert_eq!(
            CryptoUtils::to_hex(&digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_pubkey_hash_is_sha256_tail() {
        let key = [0x04u8; 65];
        let digest = CryptoUtils::sha256(&key);
        let hash = CryptoUtils::pubkey_hash(&key);
        assert_eq!(hash.len(), PUBKEY_HASH_LEN);
        assert_eq!(&digest[12..], &hash[..]);
    }

    #[test]
    fn test_hex_round_trip() {
        let bytes = [0xde, 0xad, 0xbe, 0xef];
        let encoded = CryptoUtils::to_hex(&bytes);
        assert_eq!(encoded, "deadbeef");
        assert_eq!(CryptoUtils::from_hex(&encoded).unwrap(), bytes.to_vec());
        assert!(CryptoUtils::from_hex("not-hex").is_err());
    }
}
