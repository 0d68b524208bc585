use thiserror::Error;

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Invalid Ethereum address: {0}")]
    InvalidAddress(String),

    #[error("Invalid password or corrupt keystore")]
    InvalidPassword,

    #[error("All RPC endpoints failed")]
    AllEndpointsFailed,

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Invalid balance: {0}")]
    InvalidBalance(String),

    #[error("{0}")]
    Validation(String),

    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    #[error("Keystore error: {0}")]
    Keystore(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for WalletError {
    fn from(e: reqwest::Error) -> Self {
        WalletError::Rpc(e.to_string())
    }
}
