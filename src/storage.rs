//! Persistence for the wallet list.
//!
//! - `KeyValueStore`: string key/value namespace the list lives in
//! - `FileStore`: one JSON object file on disk
//! - `MemoryStore`: in-process map
//! - `WalletStorage`: list operations under the fixed `wallets` key

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StorageError;
use crate::wallet::WalletRecord;

pub const WALLETS_KEY: &str = "wallets";
const STORE_FILE: &str = "storage.json";

/// Synchronous string key/value storage.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;
}

#[derive(Clone, Debug)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a store rooted at the given directory. Nothing is touched until the first write.
    pub fn new_with_base_dir(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_path
    }

    fn file_path(&self) -> PathBuf {
        self.base_path.join(STORE_FILE)
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let path = self.file_path();
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), StorageError> {
        fs::create_dir_all(&self.base_path)?;
        let json = serde_json::to_string_pretty(map)?;
        fs::write(self.file_path(), json)?;
        log::debug!("Store flushed to {:?}", self.file_path());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_map()?.remove(key))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        // An unreadable store file is replaced rather than blocking every write.
        let mut map = self.read_map().unwrap_or_else(|e| {
            log::warn!("Discarding unreadable store {:?}: {}", self.file_path(), e);
            BTreeMap::new()
        });
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        let mut map = match self.read_map() {
            Ok(map) => map,
            Err(StorageError::Json(_)) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        map.remove(key);
        self.write_map(&map)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.lock().unwrap_or_else(|e| e.into_inner()).get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.items
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        self.items.lock().unwrap_or_else(|e| e.into_inner()).remove(key);
        Ok(())
    }
}

/// The wallet list, persisted as JSON text under [`WALLETS_KEY`].
///
/// Every mutation is written straight through to the underlying store.
pub struct WalletStorage<S> {
    store: S,
}

impl<S: KeyValueStore> WalletStorage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load all records. Missing or corrupt data yields an empty list.
    pub fn load_all(&self) -> Vec<WalletRecord> {
        let raw = match self.store.get_item(WALLETS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                log::warn!("Failed to read wallet store: {}", e);
                return Vec::new();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(wallets) => wallets,
            Err(e) => {
                log::warn!("Stored wallet list is corrupt, ignoring it: {}", e);
                Vec::new()
            }
        }
    }

    /// Overwrite the stored list. Duplicate addresses collapse to the last record given.
    pub fn save_all(&self, wallets: &[WalletRecord]) -> Result<(), StorageError> {
        let deduped = dedup_by_address(wallets);
        let json = serde_json::to_string(&deduped)?;
        self.store.set_item(WALLETS_KEY, &json)
    }

    /// Insert a record, or replace the one with the same address in place.
    pub fn upsert(&self, wallet: WalletRecord) -> Result<(), StorageError> {
        let mut wallets = self.load_all();
        match wallets.iter_mut().find(|w| w.has_address(&wallet.address)) {
            Some(existing) => *existing = wallet,
            None => wallets.push(wallet),
        }
        self.save_all(&wallets)
    }

    pub fn remove(&self, address: &str) -> Result<(), StorageError> {
        let mut wallets = self.load_all();
        wallets.retain(|w| !w.has_address(address));
        self.save_all(&wallets)
    }

    pub fn find(&self, address: &str) -> Option<WalletRecord> {
        self.load_all().into_iter().find(|w| w.has_address(address))
    }

    /// Set balance and refresh the timestamp. Unknown addresses are ignored.
    pub fn update_balance(&self, address: &str, balance: &str) -> Result<(), StorageError> {
        let mut wallets = self.load_all();
        let Some(wallet) = wallets.iter_mut().find(|w| w.has_address(address)) else {
            return Ok(());
        };
        wallet.balance = Some(balance.to_string());
        wallet.last_updated = Some(Utc::now());
        self.save_all(&wallets)
    }

    pub fn export_all(&self) -> Result<String, StorageError> {
        Ok(serde_json::to_string_pretty(&self.load_all())?)
    }

    /// Replace the stored list with an export. Returns `false`, leaving the
    /// store untouched, if the data does not parse as a wallet list.
    pub fn import_all(&self, data: &str) -> Result<bool, StorageError> {
        let wallets: Vec<WalletRecord> = match serde_json::from_str(data) {
            Ok(wallets) => wallets,
            Err(e) => {
                log::warn!("Import rejected: {}", e);
                return Ok(false);
            }
        };
        self.save_all(&wallets)?;
        Ok(true)
    }

    pub fn clear_all(&self) -> Result<(), StorageError> {
        self.store.remove_item(WALLETS_KEY)
    }
}

fn dedup_by_address(wallets: &[WalletRecord]) -> Vec<WalletRecord> {
    let mut out: Vec<WalletRecord> = Vec::with_capacity(wallets.len());
    for wallet in wallets {
        match out.iter_mut().find(|w| w.has_address(&wallet.address)) {
            Some(existing) => *existing = wallet.clone(),
            None => out.push(wallet.clone()),
        }
    }
    out
}
