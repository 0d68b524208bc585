use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Keccak256};

use crate::error::WalletError;
use crate::wallet::Keypair;

// Pre-compute and cache the secp256k1 context
thread_local! {
    static SECP: Secp256k1<secp256k1::All> = Secp256k1::new();
}

/// Generate a fresh random account.
pub fn generate_keypair() -> Keypair {
    let secret = SecretKey::new(&mut secp256k1::rand::thread_rng());
    keypair_from_secret(secret)
}

/// Build a keypair from raw 32-byte secret key material.
pub fn keypair_from_slice(private_key: &[u8]) -> Result<Keypair, WalletError> {
    let secret = SecretKey::from_slice(private_key)
        .map_err(|e| WalletError::Keystore(format!("invalid secret key: {}", e)))?;
    Ok(keypair_from_secret(secret))
}

#[inline]
pub fn keypair_from_secret(secret: SecretKey) -> Keypair {
    let address = to_checksum_address(&address_bytes(&secret));
    Keypair { secret, address }
}

/// Ethereum address bytes: last 20 bytes of Keccak256 over the uncompressed pubkey.
#[inline(always)]
pub fn address_bytes(secret: &SecretKey) -> [u8; 20] {
    SECP.with(|secp| {
        let public_key = PublicKey::from_secret_key(secp, secret);

        // Keccak256 of uncompressed pubkey
        let pubkey_uncompressed = public_key.serialize_uncompressed();
        let keccak_hash = Keccak256::digest(&pubkey_uncompressed[1..]); // Skip 0x04

        let mut out = [0u8; 20];
        out.copy_from_slice(&keccak_hash[12..]);
        out
    })
}

/// EIP-55 mixed-case checksum rendering.
pub fn to_checksum_address(address: &[u8; 20]) -> String {
    checksum_hex(&hex::encode(address))
}

fn checksum_hex(lower: &str) -> String {
    let hash = Keccak256::digest(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
        if c.is_ascii_alphabetic() && nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// `0x` + 40 hex chars. Single-case bodies skip the checksum; mixed case must match EIP-55.
pub fn is_valid_address(address: &str) -> bool {
    let body = match address.strip_prefix("0x") {
        Some(body) => body,
        None => return false,
    };

    if body.len() != 40 || !body.chars().all(|c| c.is_ascii_hexdigit()) {
        return false;
    }

    let has_lower = body.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = body.chars().any(|c| c.is_ascii_uppercase());
    if !(has_lower && has_upper) {
        return true;
    }

    checksum_hex(&body.to_ascii_lowercase()) == address
}
