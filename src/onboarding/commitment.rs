//! Private Key Commitment
//!
//! One-way Keccak-256 commitment of the private key. The commitment is
//! the only trace of the key that is ever persisted; it supports later
//! equality checks but can never recover the key.

use sha3::{Digest, Keccak256};

/// Hash the UTF-8 bytes of the hex-encoded private key.
///
/// Deterministic: the same key always yields the same commitment. The
/// input is not retained.
pub fn commit_private_key(private_key_hex: &str) -> String {
    let mut hasher = Keccak256::new();
    hasher.update(private_key_hex.as_bytes());
    format!("0x{}", hex::encode(hasher.finalize()))
}
