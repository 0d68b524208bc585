//! Application state: the wallet slice, the UI slice, and the operations
//! that move between them.
//!
//! `AppState` is the single owner of both slices and of the wallet storage.
//! Every change to the wallet list is written through to storage before the
//! operation returns. The decrypted private key only ever lives in
//! [`WalletState::private_key`].

use chrono::{DateTime, Utc};
use std::time::Duration;
use zeroize::Zeroizing;

use crate::error::WalletError;
use crate::generator::generate_keypair;
use crate::keystore::{self, ScryptParams};
use crate::rpc::{fetch_balance, BalanceProvider};
use crate::storage::{KeyValueStore, WalletStorage};
use crate::wallet::WalletRecord;

pub const MIN_PASSWORD_LEN: usize = 8;
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Generate,
    Wallets,
    WalletDetail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: u64,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Default)]
pub struct WalletState {
    pub wallets: Vec<WalletRecord>,
    /// Address of the selected wallet
    pub current: Option<String>,
    pub private_key: Option<Zeroizing<String>>,
    pub is_loading: bool,
    pub error: Option<String>,
    balance_generation: u64,
}

#[derive(Debug, Default)]
pub struct UiState {
    pub active_tab: Tab,
    pub show_private_key: bool,
    pub notifications: Vec<Notification>,
    next_notification_id: u64,
}

/// Ticket for one in-flight balance lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceRequest {
    pub token: u64,
    pub address: String,
}

pub struct AppState<S> {
    pub wallet: WalletState,
    pub ui: UiState,
    storage: WalletStorage<S>,
    scrypt: ScryptParams,
}

impl<S: KeyValueStore> AppState<S> {
    pub fn new(storage: WalletStorage<S>, scrypt: ScryptParams) -> Self {
        Self {
            wallet: WalletState::default(),
            ui: UiState::default(),
            storage,
            scrypt,
        }
    }

    pub fn storage(&self) -> &WalletStorage<S> {
        &self.storage
    }

    pub fn load_wallets(&mut self) {
        self.wallet.wallets = self.storage.load_all();
        log::debug!("Loaded {} wallets", self.wallet.wallets.len());
    }

    pub fn current_wallet(&self) -> Option<&WalletRecord> {
        let current = self.wallet.current.as_deref()?;
        self.wallet.wallets.iter().find(|w| w.has_address(current))
    }

    fn is_current(&self, address: &str) -> bool {
        self.wallet
            .current
            .as_deref()
            .map_or(false, |current| current.eq_ignore_ascii_case(address))
    }

    // == Navigation ==

    /// Switch tabs. Leaving the detail view drops the decrypted key.
    pub fn navigate(&mut self, tab: Tab) {
        if self.ui.active_tab == Tab::WalletDetail && tab != Tab::WalletDetail {
            self.hide_private_key();
        }
        self.ui.active_tab = tab;
    }

    pub fn select_wallet(&mut self, address: &str) -> Result<(), WalletError> {
        let record = self
            .wallet
            .wallets
            .iter()
            .find(|w| w.has_address(address))
            .ok_or_else(|| WalletError::WalletNotFound(address.to_string()))?;

        self.wallet.current = Some(record.address.clone());
        self.hide_private_key();
        // Anything still in flight belongs to the previous selection.
        self.wallet.balance_generation += 1;
        self.wallet.is_loading = false;
        self.navigate(Tab::WalletDetail);
        Ok(())
    }

    // == Private key visibility ==

    pub fn toggle_private_key(&mut self) {
        self.ui.show_private_key = !self.ui.show_private_key;
    }

    /// Forget the decrypted key and hide it.
    pub fn hide_private_key(&mut self) {
        self.wallet.private_key = None;
        self.ui.show_private_key = false;
    }

    /// The decrypted key, only while it is marked visible.
    pub fn visible_private_key(&self) -> Option<&str> {
        if self.ui.show_private_key {
            self.wallet.private_key.as_ref().map(|k| k.as_str())
        } else {
            None
        }
    }

    pub fn clear_error(&mut self) {
        self.wallet.error = None;
    }

    fn start_loading(&mut self) {
        self.wallet.is_loading = true;
        self.wallet.error = None;
    }

    fn fail(&mut self, message: &str, error: WalletError) -> WalletError {
        log::warn!("{}: {}", message, error);
        self.wallet.is_loading = false;
        self.wallet.error = Some(message.to_string());
        self.notify(Severity::Error, message);
        error
    }

    // == Wallet lifecycle ==

    /// Generate a keypair, encrypt it under `password` and store it.
    pub async fn generate_wallet(&mut self, password: &str, confirm: &str) -> Result<WalletRecord, WalletError> {
        if let Err(e) = validate_new_password(password, confirm) {
            self.notify(Severity::Error, &e.to_string());
            return Err(e);
        }

        self.start_loading();

        let params = self.scrypt;
        let password = Zeroizing::new(password.to_string());
        let result = tokio::task::spawn_blocking(move || {
            let keypair = generate_keypair();
            let encrypted_json = keystore::encrypt(&keypair, &password, &params)?;
            Ok::<_, WalletError>(WalletRecord::new(keypair.address().to_string(), encrypted_json))
        })
        .await
        .unwrap_or_else(|e| Err(WalletError::Internal(e.to_string())));

        let record = match result {
            Ok(record) => record,
            Err(e) => return Err(self.fail("Failed to generate wallet", e)),
        };

        if let Err(e) = self.storage.upsert(record.clone()) {
            return Err(self.fail("Failed to generate wallet", e.into()));
        }
        self.wallet.wallets.push(record.clone());
        self.wallet.is_loading = false;

        log::info!("Generated wallet {}", record.address);
        self.notify(Severity::Success, "Wallet generated successfully!");
        Ok(record)
    }

    /// Decrypt the selected wallet's keystore and hold the private key in memory.
    pub async fn decrypt_current(&mut self, password: &str) -> Result<(), WalletError> {
        if password.is_empty() {
            self.notify(Severity::Error, "Please enter password");
            return Err(WalletError::Validation("Please enter password".to_string()));
        }

        let record = match self.current_wallet() {
            Some(record) => record.clone(),
            None => {
                self.notify(Severity::Error, "No wallet selected");
                return Err(WalletError::Validation("No wallet selected".to_string()));
            }
        };

        self.start_loading();

        let password = Zeroizing::new(password.to_string());
        let encrypted_json = record.encrypted_json.clone();
        let result = tokio::task::spawn_blocking(move || keystore::decrypt(&encrypted_json, &password))
            .await
            .unwrap_or_else(|e| Err(WalletError::Internal(e.to_string())));

        let keypair = match result {
            // A keystore for some other account is as good as a wrong password here.
            Ok(keypair) if record.has_address(keypair.address()) => keypair,
            Ok(_) => return Err(self.fail("Invalid password", WalletError::InvalidPassword)),
            Err(e) => return Err(self.fail("Invalid password", e)),
        };

        self.wallet.private_key = Some(Zeroizing::new(keypair.private_key_hex()));
        self.wallet.is_loading = false;
        self.notify(Severity::Success, "Wallet decrypted successfully");
        Ok(())
    }

    pub fn delete_wallet(&mut self, address: &str) -> Result<(), WalletError> {
        if !self.wallet.wallets.iter().any(|w| w.has_address(address)) {
            return Err(WalletError::WalletNotFound(address.to_string()));
        }

        self.storage.remove(address)?;
        self.wallet.wallets.retain(|w| !w.has_address(address));

        if self.is_current(address) {
            self.wallet.current = None;
            self.hide_private_key();
        }

        log::info!("Deleted wallet {}", address);
        self.notify(Severity::Success, "Wallet deleted successfully");
        Ok(())
    }

    // == Balance ==

    /// Issue a token for a balance lookup of the selected wallet.
    ///
    /// Only the most recently issued token can complete; anything older is stale.
    pub fn begin_balance_refresh(&mut self) -> Result<BalanceRequest, WalletError> {
        let address = self
            .wallet
            .current
            .clone()
            .ok_or_else(|| WalletError::Validation("No wallet selected".to_string()))?;

        self.wallet.balance_generation += 1;
        self.start_loading();

        Ok(BalanceRequest {
            token: self.wallet.balance_generation,
            address,
        })
    }

    /// Apply the outcome of a lookup.
    ///
    /// Returns `Ok(false)` if the request was superseded or the selection
    /// moved on, in which case nothing changes.
    pub fn complete_balance_refresh(
        &mut self,
        request: &BalanceRequest,
        result: Result<String, WalletError>,
    ) -> Result<bool, WalletError> {
        if request.token != self.wallet.balance_generation || !self.is_current(&request.address) {
            log::debug!(
                "Discarding stale balance response for {} (token {})",
                request.address,
                request.token
            );
            return Ok(false);
        }

        let balance = match result {
            Ok(balance) => balance,
            Err(e) => return Err(self.fail("Failed to fetch balance", e)),
        };

        if let Err(e) = self.storage.update_balance(&request.address, &balance) {
            return Err(self.fail("Failed to fetch balance", e.into()));
        }
        if let Some(wallet) = self
            .wallet
            .wallets
            .iter_mut()
            .find(|w| w.has_address(&request.address))
        {
            wallet.balance = Some(balance.clone());
            wallet.last_updated = Some(Utc::now());
        }

        self.wallet.is_loading = false;
        log::info!("Balance of {}: {}", request.address, balance);
        self.notify(Severity::Info, &format!("Balance updated: {} ETH", balance));
        Ok(true)
    }

    pub async fn refresh_balance<P>(&mut self, provider: &P, endpoints: &[String]) -> Result<bool, WalletError>
    where
        P: BalanceProvider + ?Sized,
    {
        let request = self.begin_balance_refresh()?;
        let result = fetch_balance(provider, endpoints, &request.address).await;
        self.complete_balance_refresh(&request, result)
    }

    // == Import / export ==

    pub fn export_wallets(&mut self) -> Result<String, WalletError> {
        let data = self.storage.export_all()?;
        self.notify(Severity::Success, "Wallets exported successfully");
        Ok(data)
    }

    pub fn import_wallets(&mut self, data: &str) -> Result<bool, WalletError> {
        if !self.storage.import_all(data)? {
            self.notify(Severity::Error, "Invalid wallet data");
            return Ok(false);
        }

        self.load_wallets();
        if self.current_wallet().is_none() {
            self.wallet.current = None;
            self.hide_private_key();
        }
        self.notify(
            Severity::Success,
            &format!("Imported {} wallets", self.wallet.wallets.len()),
        );
        Ok(true)
    }

    pub fn clear_all(&mut self) -> Result<(), WalletError> {
        self.storage.clear_all()?;
        self.wallet.wallets.clear();
        self.wallet.current = None;
        self.hide_private_key();
        self.notify(Severity::Success, "All wallet data cleared");
        Ok(())
    }

    // == Notifications ==

    pub fn notify(&mut self, severity: Severity, message: &str) -> u64 {
        self.ui.next_notification_id += 1;
        let id = self.ui.next_notification_id;
        self.ui.notifications.push(Notification {
            id,
            severity,
            message: message.to_string(),
            timestamp: Utc::now(),
        });
        id
    }

    pub fn remove_notification(&mut self, id: u64) {
        self.ui.notifications.retain(|n| n.id != id);
    }

    pub fn clear_notifications(&mut self) {
        self.ui.notifications.clear();
    }

    /// Drop notifications that have been visible for [`NOTIFICATION_TTL`].
    pub fn expire_notifications(&mut self, now: DateTime<Utc>) {
        self.ui.notifications.retain(|n| match (now - n.timestamp).to_std() {
            Ok(age) => age < NOTIFICATION_TTL,
            Err(_) => true,
        });
    }
}

/// Password rules for new wallets, checked in this order.
pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), WalletError> {
    if password.is_empty() || confirm.is_empty() {
        return Err(WalletError::Validation("Please fill in all fields".to_string()));
    }
    if password != confirm {
        return Err(WalletError::Validation("Passwords do not match".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(WalletError::Validation(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn app() -> AppState<MemoryStore> {
        AppState::new(WalletStorage::new(MemoryStore::new()), ScryptParams::light())
    }

    fn last_message(app: &AppState<MemoryStore>) -> &str {
        &app.ui.notifications.last().unwrap().message
    }

    #[test]
    fn test_password_rules() {
        assert_eq!(
            validate_new_password("", "").unwrap_err().to_string(),
            "Please fill in all fields"
        );
        assert_eq!(
            validate_new_password("password1", "password2").unwrap_err().to_string(),
            "Passwords do not match"
        );
        assert_eq!(
            validate_new_password("short", "short").unwrap_err().to_string(),
            "Password must be at least 8 characters long"
        );
        assert!(validate_new_password("longenough", "longenough").is_ok());
    }

    #[tokio::test]
    async fn test_generate_persists_immediately() {
        let mut app = app();
        let record = app.generate_wallet("testpassword123", "testpassword123").await.unwrap();

        assert!(!app.wallet.is_loading);
        assert_eq!(app.wallet.wallets, vec![record.clone()]);
        assert_eq!(app.storage().load_all(), vec![record]);
        assert_eq!(last_message(&app), "Wallet generated successfully!");
    }

    #[tokio::test]
    async fn test_generate_rejects_bad_password() {
        let mut app = app();
        assert!(app.generate_wallet("short", "short").await.is_err());
        assert!(app.wallet.wallets.is_empty());
        assert_eq!(app.ui.notifications[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_decrypt_and_hide() {
        let mut app = app();
        let record = app.generate_wallet("testpassword123", "testpassword123").await.unwrap();
        app.select_wallet(&record.address).unwrap();
        assert_eq!(app.ui.active_tab, Tab::WalletDetail);

        assert!(app.decrypt_current("wrongpassword").await.is_err());
        assert_eq!(app.wallet.error.as_deref(), Some("Invalid password"));
        assert!(app.wallet.private_key.is_none());

        app.decrypt_current("testpassword123").await.unwrap();
        assert!(app.wallet.error.is_none());
        assert!(app.visible_private_key().is_none());
        app.toggle_private_key();
        let key = app.visible_private_key().unwrap().to_string();
        assert_eq!(key.len(), 66);

        // the secret never reaches storage
        let stored = app.storage().export_all().unwrap();
        assert!(!stored.contains(key.trim_start_matches("0x")));

        app.navigate(Tab::Wallets);
        assert!(app.wallet.private_key.is_none());
        assert!(!app.ui.show_private_key);
    }

    #[tokio::test]
    async fn test_decrypt_requires_password_and_selection() {
        let mut app = app();
        assert!(matches!(app.decrypt_current("").await, Err(WalletError::Validation(_))));
        assert!(matches!(
            app.decrypt_current("testpassword123").await,
            Err(WalletError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_current_wallet_clears_selection() {
        let mut app = app();
        let record = app.generate_wallet("testpassword123", "testpassword123").await.unwrap();
        app.select_wallet(&record.address).unwrap();
        app.decrypt_current("testpassword123").await.unwrap();

        app.delete_wallet(&record.address.to_lowercase()).unwrap();
        assert!(app.wallet.current.is_none());
        assert!(app.wallet.private_key.is_none());
        assert!(app.storage().load_all().is_empty());
        assert!(matches!(
            app.delete_wallet(&record.address),
            Err(WalletError::WalletNotFound(_))
        ));
    }

    fn seeded(addresses: &[&str]) -> AppState<MemoryStore> {
        let mut app = app();
        let records: Vec<_> = addresses
            .iter()
            .map(|a| WalletRecord::new(a.to_string(), "{}".to_string()))
            .collect();
        app.storage().save_all(&records).unwrap();
        app.load_wallets();
        app
    }

    const A: &str = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf";
    const B: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    #[test]
    fn test_stale_balance_response_is_discarded() {
        let mut app = seeded(&[A]);
        app.select_wallet(A).unwrap();

        let first = app.begin_balance_refresh().unwrap();
        let second = app.begin_balance_refresh().unwrap();

        assert!(app.complete_balance_refresh(&second, Ok("2.000000".into())).unwrap());
        assert!(!app.complete_balance_refresh(&first, Ok("1.000000".into())).unwrap());

        assert_eq!(app.current_wallet().unwrap().balance.as_deref(), Some("2.000000"));
        assert_eq!(
            app.storage().find(A).unwrap().balance.as_deref(),
            Some("2.000000")
        );
    }

    #[test]
    fn test_balance_for_previous_selection_is_discarded() {
        let mut app = seeded(&[A, B]);
        app.select_wallet(A).unwrap();
        let request = app.begin_balance_refresh().unwrap();

        app.select_wallet(B).unwrap();
        assert!(!app.complete_balance_refresh(&request, Ok("5.000000".into())).unwrap());
        assert!(app.storage().find(A).unwrap().balance.is_none());
        assert!(!app.wallet.is_loading);
    }

    #[test]
    fn test_balance_failure_sets_error() {
        let mut app = seeded(&[A]);
        app.select_wallet(A).unwrap();
        let request = app.begin_balance_refresh().unwrap();

        let result = app.complete_balance_refresh(&request, Err(WalletError::AllEndpointsFailed));
        assert!(matches!(result, Err(WalletError::AllEndpointsFailed)));
        assert_eq!(app.wallet.error.as_deref(), Some("Failed to fetch balance"));
        assert!(!app.wallet.is_loading);

        app.clear_error();
        assert!(app.wallet.error.is_none());
    }

    #[test]
    fn test_import_replaces_list() {
        let mut app = seeded(&[A]);
        app.select_wallet(A).unwrap();

        let data = serde_json::to_string(&vec![WalletRecord::new(B.to_string(), "{}".to_string())]).unwrap();
        assert!(app.import_wallets(&data).unwrap());
        assert_eq!(app.wallet.wallets.len(), 1);
        assert!(app.wallet.current.is_none());

        assert!(!app.import_wallets("garbage").unwrap());
        assert_eq!(app.wallet.wallets[0].address, B);
    }

    #[test]
    fn test_clear_all() {
        let mut app = seeded(&[A, B]);
        app.clear_all().unwrap();
        assert!(app.wallet.wallets.is_empty());
        assert!(app.storage().load_all().is_empty());
    }

    #[test]
    fn test_notification_lifecycle() {
        let mut app = app();
        let first = app.notify(Severity::Info, "one");
        let second = app.notify(Severity::Warning, "two");
        assert_ne!(first, second);

        app.remove_notification(first);
        assert_eq!(app.ui.notifications.len(), 1);

        let created = app.ui.notifications[0].timestamp;
        app.expire_notifications(created + chrono::Duration::milliseconds(2999));
        assert_eq!(app.ui.notifications.len(), 1);
        app.expire_notifications(created + chrono::Duration::milliseconds(3000));
        assert!(app.ui.notifications.is_empty());

        app.notify(Severity::Success, "three");
        app.clear_notifications();
        assert!(app.ui.notifications.is_empty());
    }

    #[test]
    fn test_select_unknown_wallet() {
        let mut app = seeded(&[A]);
        assert!(matches!(app.select_wallet(B), Err(WalletError::WalletNotFound(_))));
        assert_eq!(app.ui.active_tab, Tab::Generate);
    }
}
