pub mod cli;
pub mod config;
pub mod error;
pub mod format;
pub mod generator;
pub mod keystore;
pub mod rpc;
pub mod state;
pub mod storage;
pub mod wallet;

pub use cli::{Args, Command};
pub use config::Config;
pub use error::{StorageError, WalletError};
pub use format::{format_balance, shorten_address, wei_to_ether, DEFAULT_VISIBLE_CHARS};
pub use generator::{generate_keypair, is_valid_address, to_checksum_address};
pub use keystore::{decrypt, encrypt, ScryptParams};
pub use rpc::{fetch_balance, BalanceProvider, JsonRpcClient};
pub use state::{AppState, BalanceRequest, Notification, Severity, Tab};
pub use storage::{FileStore, KeyValueStore, MemoryStore, WalletStorage};
pub use wallet::{Keypair, WalletRecord};
