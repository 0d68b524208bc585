//! Web3 Secret Storage (keystore v3) encryption.
//!
//! The secret key is encrypted with AES-128-CTR under the first half of an
//! scrypt-derived key; the second half authenticates the ciphertext through a
//! Keccak256 MAC. Any failure while opening a container is reported as
//! [`WalletError::InvalidPassword`] so callers cannot tell a wrong password
//! from a damaged file.

use aes::cipher::{KeyIvInit, StreamCipher};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use subtle::ConstantTimeEq;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::error::WalletError;
use crate::generator::keypair_from_slice;
use crate::wallet::Keypair;

type Aes128Ctr = ctr::Ctr128BE<aes::Aes128>;

const KEYSTORE_VERSION: u32 = 3;
const CIPHER: &str = "aes-128-ctr";
const KDF: &str = "scrypt";
const DKLEN: usize = 32;
const SALT_LEN: usize = 32;
const IV_LEN: usize = 16;
/// Upper bound on the scrypt working set a container may ask for.
const MAX_SCRYPT_MEMORY: u64 = 1 << 30;

/// scrypt cost parameters used when encrypting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScryptParams {
    pub log_n: u8,
    pub r: u32,
    pub p: u32,
}

impl ScryptParams {
    /// n = 2^12. Fast enough for tests and low-power hosts.
    pub fn light() -> Self {
        Self { log_n: 12, r: 8, p: 1 }
    }
}

impl Default for ScryptParams {
    /// n = 2^17, r = 8, p = 1
    fn default() -> Self {
        Self { log_n: 17, r: 8, p: 1 }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct KeystoreFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(alias = "Crypto")]
    crypto: CryptoSection,
    #[serde(default)]
    id: String,
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct CryptoSection {
    cipher: String,
    cipherparams: CipherParams,
    ciphertext: String,
    kdf: String,
    kdfparams: KdfParams,
    mac: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CipherParams {
    iv: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct KdfParams {
    dklen: usize,
    n: u64,
    r: u32,
    p: u32,
    salt: String,
}

fn derive_key(
    password: &str,
    salt: &[u8],
    log_n: u8,
    r: u32,
    p: u32,
) -> Option<Zeroizing<[u8; DKLEN]>> {
    let params = scrypt::Params::new(log_n, r, p, DKLEN).ok()?;
    let mut derived = Zeroizing::new([0u8; DKLEN]);
    scrypt::scrypt(password.as_bytes(), salt, &params, &mut derived[..]).ok()?;
    Some(derived)
}

fn mac(derived: &[u8; DKLEN], ciphertext: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(&derived[16..32]);
    hasher.update(ciphertext);
    hasher.finalize().into()
}

/// 128 * r * n * p bytes, bounded by [`MAX_SCRYPT_MEMORY`].
fn scrypt_cost_acceptable(n: u64, r: u32, p: u32) -> bool {
    128u64
        .checked_mul(u64::from(r))
        .and_then(|v| v.checked_mul(n))
        .and_then(|v| v.checked_mul(u64::from(p)))
        .map_or(false, |bytes| bytes <= MAX_SCRYPT_MEMORY)
}

/// Encrypt a keypair into keystore v3 JSON. Salt and IV are fresh on every call.
pub fn encrypt(keypair: &Keypair, password: &str, params: &ScryptParams) -> Result<String, WalletError> {
    let mut rng = rand::thread_rng();
    let mut salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    rng.fill_bytes(&mut salt);
    rng.fill_bytes(&mut iv);

    let derived = derive_key(password, &salt, params.log_n, params.r, params.p)
        .ok_or_else(|| WalletError::Keystore(format!("invalid scrypt parameters: {:?}", params)))?;

    let mut ciphertext = keypair.secret_key().secret_bytes().to_vec();
    let mut cipher = Aes128Ctr::new_from_slices(&derived[..16], &iv)
        .map_err(|e| WalletError::Keystore(e.to_string()))?;
    cipher.apply_keystream(&mut ciphertext);

    let file = KeystoreFile {
        address: Some(keypair.address().trim_start_matches("0x").to_lowercase()),
        crypto: CryptoSection {
            cipher: CIPHER.to_string(),
            cipherparams: CipherParams { iv: hex::encode(iv) },
            ciphertext: hex::encode(&ciphertext),
            kdf: KDF.to_string(),
            kdfparams: KdfParams {
                dklen: DKLEN,
                n: 1u64 << params.log_n,
                r: params.r,
                p: params.p,
                salt: hex::encode(salt),
            },
            mac: hex::encode(mac(&derived, &ciphertext)),
        },
        id: Uuid::new_v4().to_string(),
        version: KEYSTORE_VERSION,
    };

    serde_json::to_string(&file).map_err(|e| WalletError::Keystore(e.to_string()))
}

/// Decrypt keystore v3 JSON back into the keypair it protects.
pub fn decrypt(encrypted_json: &str, password: &str) -> Result<Keypair, WalletError> {
    open(encrypted_json, password).ok_or(WalletError::InvalidPassword)
}

fn open(encrypted_json: &str, password: &str) -> Option<Keypair> {
    let file: KeystoreFile = match serde_json::from_str(encrypted_json) {
        Ok(file) => file,
        Err(e) => {
            log::debug!("keystore JSON rejected: {}", e);
            return None;
        }
    };

    let crypto = &file.crypto;
    if file.version != KEYSTORE_VERSION
        || !crypto.kdf.eq_ignore_ascii_case(KDF)
        || !crypto.cipher.eq_ignore_ascii_case(CIPHER)
        || crypto.kdfparams.dklen != DKLEN
    {
        log::debug!(
            "unsupported keystore: version={} kdf={} cipher={}",
            file.version,
            crypto.kdf,
            crypto.cipher
        );
        return None;
    }

    let n = crypto.kdfparams.n;
    if n < 2 || !n.is_power_of_two() {
        return None;
    }
    let log_n = u8::try_from(n.trailing_zeros()).ok()?;
    if !scrypt_cost_acceptable(n, crypto.kdfparams.r, crypto.kdfparams.p) {
        log::warn!(
            "keystore scrypt cost too high: n={} r={} p={}",
            n,
            crypto.kdfparams.r,
            crypto.kdfparams.p
        );
        return None;
    }

    let salt = hex::decode(&crypto.kdfparams.salt).ok()?;
    let iv = hex::decode(&crypto.cipherparams.iv).ok()?;
    let ciphertext = hex::decode(&crypto.ciphertext).ok()?;
    let expected_mac = hex::decode(&crypto.mac).ok()?;

    let derived = derive_key(password, &salt, log_n, crypto.kdfparams.r, crypto.kdfparams.p)?;
    if !bool::from(mac(&derived, &ciphertext)[..].ct_eq(&expected_mac[..])) {
        return None;
    }

    let mut plaintext = Zeroizing::new(ciphertext);
    let mut cipher = Aes128Ctr::new_from_slices(&derived[..16], &iv).ok()?;
    cipher.apply_keystream(&mut plaintext);

    let keypair = keypair_from_slice(&plaintext).ok()?;

    if let Some(declared) = &file.address {
        let declared = declared.trim_start_matches("0x");
        if !keypair.address().trim_start_matches("0x").eq_ignore_ascii_case(declared) {
            log::warn!("keystore address does not match decrypted key");
            return None;
        }
    }

    Some(keypair)
}
