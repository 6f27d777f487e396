//! Signature Verification
//!
//! ECDSA over secp256k1. Spend authorizations carry an uncompressed
//! public key and a signature split into big-endian R and S words.

use secp256k1::{ecdsa, Message, PublicKey, Secp256k1};

use crate::crypto::{CryptoError, CryptoResult};

/// Length of an uncompressed secp256k1 public key
pub const UNCOMPRESSED_PUBKEY_LEN: usize = 65;

/// Length of one signature component
pub const SIG_COMPONENT_LEN: usize = 32;

/// Parse an uncompressed secp256k1 public key.
pub fn parse_public_key(bytes: &[u8]) -> CryptoResult<PublicKey> {
    if bytes.len() != UNCOMPRESSED_PUBKEY_LEN {
        return Err(CryptoError::InvalidPublicKey(format!(
            "expected {} bytes, got {}",
            UNCOMPRESSED_PUBKEY_LEN,
            bytes.len()
        )));
    }
    PublicKey::from_slice(bytes).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

/// Verify an ECDSA signature over a 32-byte digest.
///
/// `r` and `s` are big-endian 32-byte words. Returns `Ok(false)` for a
/// well-formed signature that does not verify; malformed components are
/// an error.
pub fn verify_signature(
    public_key: &PublicKey,
    digest: &[u8; 32],
    r: &[u8; SIG_COMPONENT_LEN],
    s: &[u8; SIG_COMPONENT_LEN],
) -> CryptoResult<bool> {
    let mut compact = [0u8; SIG_COMPONENT_LEN * 2];
    compact[..SIG_COMPONENT_LEN].copy_from_slice(r);
    compact[SIG_COMPONENT_LEN..].copy_from_slice(s);

    let mut signature = ecdsa::Signature::from_compact(&compact)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    // Accept high-S encodings; verification requires the normalized form.
    signature.normalize_s();

    let message = Message::from_digest_slice(digest)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

    let secp = Secp256k1::verification_only();
    Ok(secp.verify_ecdsa(&message, &signature, public_key).is_ok())
}
