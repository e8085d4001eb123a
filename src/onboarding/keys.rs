//! Key Material Generation
//!
//! Produces the secp256k1 key pair and derived wallet address assigned
//! to an identity during onboarding. The private key never leaves this
//! module except wrapped in the one-time disclosure type.

use alloy::primitives::Address;
use alloy::signers::local::PrivateKeySigner;

use crate::types::DisclosedPrivateKey;

/// Freshly generated key material for one onboarding attempt.
pub struct KeyMaterial {
    /// Hex-encoded uncompressed public key with "0x" prefix.
    pub public_key: String,
    /// Checksummed wallet address derived from the public key.
    pub wallet_address: String,
    /// Hex-encoded private key, disclosed once to the caller.
    pub private_key: DisclosedPrivateKey,
}

/// Generate a fresh random key pair and derive its wallet address.
///
/// Draws from the OS CSPRNG; an unavailable entropy source aborts the
/// process rather than retrying. Pure apart from that randomness -- no
/// I/O, no persistence.
pub fn generate_keypair() -> KeyMaterial {
    let signer = PrivateKeySigner::random();

    let private_key_bytes = signer.credential().to_bytes();
    let private_key_hex = format!("0x{}", hex::encode(private_key_bytes));

    let public_key_point = signer.credential().verifying_key().to_encoded_point(false);
    let public_key = format!("0x{}", hex::encode(public_key_point.as_bytes()));

    let wallet_address = signer.address().to_checksum(None);

    KeyMaterial {
        public_key,
        wallet_address,
        private_key: DisclosedPrivateKey::new(private_key_hex),
    }
}

/// Validate a wallet address: 0x-prefixed, 20 bytes of hex.
pub fn is_valid_wallet_address(value: &str) -> bool {
    value.parse::<Address>().is_ok()
}
