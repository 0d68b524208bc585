use chrono::Utc;
use evm_wallet_manager::{FileStore, KeyValueStore, WalletRecord, WalletStorage};
use tempfile::TempDir;

const ADDRESS: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";

fn mock_wallet() -> WalletRecord {
    WalletRecord {
        address: ADDRESS.to_string(),
        encrypted_json: r#"{"version":3,"id":"test","crypto":{"cipher":"aes-128-ctr"}}"#.to_string(),
        balance: Some("1.234567".to_string()),
        last_updated: Some(Utc::now()),
    }
}

fn setup() -> (TempDir, WalletStorage<FileStore>) {
    env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init()
        .ok();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage = WalletStorage::new(FileStore::new_with_base_dir(temp_dir.path().join("store")));
    (temp_dir, storage)
}

#[test]
fn test_empty_when_nothing_stored() {
    let (_dir, storage) = setup();
    assert!(storage.load_all().is_empty());
}

#[test]
fn test_save_and_retrieve() {
    let (_dir, storage) = setup();
    let wallets = vec![mock_wallet()];
    storage.save_all(&wallets).unwrap();

    assert_eq!(storage.load_all(), wallets);
}

#[test]
fn test_persists_across_instances() {
    let (dir, storage) = setup();
    let wallet = mock_wallet();
    storage.upsert(wallet.clone()).unwrap();

    let reopened = WalletStorage::new(FileStore::new_with_base_dir(dir.path().join("store")));
    assert_eq!(reopened.load_all(), vec![wallet]);
}

#[test]
fn test_add_new_wallet() {
    let (_dir, storage) = setup();
    let wallet = mock_wallet();
    storage.upsert(wallet.clone()).unwrap();

    let wallets = storage.load_all();
    assert_eq!(wallets.len(), 1);
    assert_eq!(wallets[0], wallet);
}

#[test]
fn test_upsert_replaces_existing() {
    let (_dir, storage) = setup();
    let wallet = mock_wallet();
    storage.upsert(wallet.clone()).unwrap();

    let updated = WalletRecord {
        balance: Some("2.345678".to_string()),
        ..wallet
    };
    storage.upsert(updated).unwrap();

    let wallets = storage.load_all();
    assert_eq!(wallets.len(), 1);
    assert_eq!(wallets[0].balance.as_deref(), Some("2.345678"));
}

#[test]
fn test_remove_wallet() {
    let (_dir, storage) = setup();
    storage.upsert(mock_wallet()).unwrap();
    assert_eq!(storage.load_all().len(), 1);

    storage.remove(ADDRESS).unwrap();
    assert!(storage.load_all().is_empty());
}

#[test]
fn test_update_balance() {
    let (_dir, storage) = setup();
    let wallet = WalletRecord {
        last_updated: None,
        ..mock_wallet()
    };
    storage.upsert(wallet).unwrap();

    storage.update_balance(ADDRESS, "3.456789").unwrap();

    let wallets = storage.load_all();
    assert_eq!(wallets[0].balance.as_deref(), Some("3.456789"));
    assert!(wallets[0].last_updated.is_some());
}

#[test]
fn test_export_and_import() {
    let (_dir, storage) = setup();
    let wallets = vec![mock_wallet()];
    storage.save_all(&wallets).unwrap();

    let exported = storage.export_all().unwrap();

    storage.clear_all().unwrap();
    assert!(storage.load_all().is_empty());

    assert!(storage.import_all(&exported).unwrap());
    assert_eq!(storage.load_all(), wallets);
}

#[test]
fn test_clear_all() {
    let (_dir, storage) = setup();
    storage.upsert(mock_wallet()).unwrap();
    assert_eq!(storage.load_all().len(), 1);

    storage.clear_all().unwrap();
    assert!(storage.load_all().is_empty());
}

#[test]
fn test_corrupt_store_file_degrades_to_empty() {
    let (dir, storage) = setup();
    let store_dir = dir.path().join("store");
    std::fs::create_dir_all(&store_dir).unwrap();
    std::fs::write(store_dir.join("storage.json"), "{{{ not json").unwrap();

    assert!(storage.load_all().is_empty());

    // the next write replaces the damaged file
    storage.upsert(mock_wallet()).unwrap();
    assert_eq!(storage.load_all().len(), 1);
}

#[test]
fn test_other_keys_are_left_alone() {
    let (_dir, storage) = setup();
    storage.store().set_item("settings", "{\"theme\":\"dark\"}").unwrap();
    storage.upsert(mock_wallet()).unwrap();
    storage.clear_all().unwrap();

    assert_eq!(
        storage.store().get_item("settings").unwrap().as_deref(),
        Some("{\"theme\":\"dark\"}")
    );
}
