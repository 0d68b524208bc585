use chrono::{DateTime, Utc};
use secp256k1::SecretKey;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored wallet: the address plus its password-encrypted keystore.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WalletRecord {
    pub address: String,  // EIP-55 address
    #[serde(rename = "encryptedJson")]
    pub encrypted_json: String,  // Keystore v3 JSON
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub balance: Option<String>,
    #[serde(rename = "lastUpdated", skip_serializing_if = "Option::is_none", default)]
    pub last_updated: Option<DateTime<Utc>>,
}

impl WalletRecord {
    pub fn new(address: String, encrypted_json: String) -> Self {
        Self {
            address,
            encrypted_json,
            balance: None,
            last_updated: Some(Utc::now()),
        }
    }

    /// Addresses compare case-insensitively; checksum casing is presentation only.
    pub fn has_address(&self, address: &str) -> bool {
        self.address.eq_ignore_ascii_case(address)
    }
}

/// An account secret key and the address derived from it.
#[derive(Clone, PartialEq)]
pub struct Keypair {
    pub(crate) secret: SecretKey,
    pub(crate) address: String,
}

impl Keypair {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn secret_key(&self) -> &SecretKey {
        &self.secret
    }

    /// `0x` followed by 64 lowercase hex characters.
    pub fn private_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.secret.secret_bytes()))
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}
