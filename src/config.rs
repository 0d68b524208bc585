//! Wallet manager configuration from environment variables
//!
//! Controls where wallets are stored, which JSON-RPC endpoints are queried
//! for balances (in order), and how expensive new keystores are.
//! Defaults to the public Sepolia endpoints.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::keystore::ScryptParams;

pub const SEPOLIA_CHAIN_ID: u64 = 11155111;

pub const DEFAULT_RPC_ENDPOINTS: &[&str] = &[
    "https://rpc.sepolia.org",
    "https://eth-sepolia.g.alchemy.com/v2/demo",
    "https://sepolia.gateway.tenderly.co",
    "https://ethereum-sepolia.blockpi.network/v1/rpc/public",
];

#[derive(Clone, Debug)]
pub struct Config {
    /// Directory holding the wallet store file
    pub data_dir: PathBuf,
    /// Ordered balance endpoints; the first one that answers wins
    pub rpc_endpoints: Vec<String>,
    /// Chain every endpoint must report via `eth_chainId`
    pub chain_id: u64,
    /// Per-request HTTP timeout
    pub rpc_timeout: Duration,
    /// scrypt cost for newly encrypted keystores
    pub scrypt: ScryptParams,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `WALLET_DATA_DIR`: store directory (default `./data/wallets`)
    /// - `WALLET_RPC_URLS`: comma-separated endpoint list
    /// - `WALLET_CHAIN_ID`: expected chain id (default Sepolia)
    /// - `WALLET_RPC_TIMEOUT_SECS`: request timeout (default 10)
    /// - `WALLET_LIGHT_KDF`: `1`/`true` for cheap scrypt parameters
    ///
    /// # Examples
    ///
    /// ```bash
    /// WALLET_RPC_URLS=http://localhost:8545 WALLET_CHAIN_ID=31337 evm-wallet balance 0x...
    /// ```
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let data_dir = env::var("WALLET_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        let rpc_endpoints = match env::var("WALLET_RPC_URLS") {
            Ok(raw) => {
                let endpoints = parse_endpoint_list(&raw);
                if endpoints.is_empty() {
                    log::warn!("WALLET_RPC_URLS is empty, using default endpoints");
                    defaults.rpc_endpoints
                } else {
                    endpoints
                }
            }
            Err(_) => defaults.rpc_endpoints,
        };

        let chain_id = match env::var("WALLET_CHAIN_ID") {
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!("Unknown chain id '{}', defaulting to Sepolia", raw);
                SEPOLIA_CHAIN_ID
            }),
            Err(_) => defaults.chain_id,
        };

        let rpc_timeout = env::var("WALLET_RPC_TIMEOUT_SECS")
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.rpc_timeout);

        let scrypt = match env::var("WALLET_LIGHT_KDF") {
            Ok(raw) if is_truthy(&raw) => ScryptParams::light(),
            _ => defaults.scrypt,
        };

        log::debug!(
            "Config: data_dir={:?} endpoints={} chain_id={}",
            data_dir,
            rpc_endpoints.len(),
            chain_id
        );

        Self {
            data_dir,
            rpc_endpoints,
            chain_id,
            rpc_timeout,
            scrypt,
        }
    }
}

impl Default for Config {
    /// Default configuration (Sepolia)
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/wallets"),
            rpc_endpoints: DEFAULT_RPC_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            chain_id: SEPOLIA_CHAIN_ID,
            rpc_timeout: Duration::from_secs(10),
            scrypt: ScryptParams::default(),
        }
    }
}

/// Split a comma-separated endpoint list, dropping blanks and keeping order.
pub fn parse_endpoint_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_truthy(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
