//! Balance lookups over Ethereum JSON-RPC with ordered endpoint fallback.

use async_trait::async_trait;
use primitive_types::U256;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::WalletError;
use crate::format::{format_balance, wei_to_ether};
use crate::generator::is_valid_address;

/// Anything that can answer "what is the balance of this address" for one endpoint.
#[async_trait]
pub trait BalanceProvider: Send + Sync {
    /// Balance in wei.
    async fn balance_of(&self, endpoint: &str, address: &str) -> Result<U256, WalletError>;
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

pub struct JsonRpcClient {
    client: reqwest::Client,
    chain_id: u64,
}

impl JsonRpcClient {
    pub fn new(chain_id: u64, timeout: Duration) -> Result<Self, WalletError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, chain_id })
    }

    async fn call(&self, endpoint: &str, method: &str, params: Value) -> Result<Value, WalletError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method,
            params,
        };

        let response: RpcResponse = self
            .client
            .post(endpoint)
            .json(&request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(WalletError::Rpc(format!(
                "{} returned error {}: {}",
                method, err.code, err.message
            )));
        }

        response
            .result
            .ok_or_else(|| WalletError::Rpc(format!("{} returned no result", method)))
    }

    async fn quantity(&self, endpoint: &str, method: &str, params: Value) -> Result<U256, WalletError> {
        let result = self.call(endpoint, method, params).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| WalletError::Rpc(format!("{} returned a non-string result", method)))?;
        parse_quantity(hex)
    }
}

#[async_trait]
impl BalanceProvider for JsonRpcClient {
    async fn balance_of(&self, endpoint: &str, address: &str) -> Result<U256, WalletError> {
        let chain_id = self.quantity(endpoint, "eth_chainId", json!([])).await?;
        if chain_id != U256::from(self.chain_id) {
            return Err(WalletError::Rpc(format!(
                "chain id mismatch: expected {}, got {}",
                self.chain_id, chain_id
            )));
        }

        self.quantity(endpoint, "eth_getBalance", json!([address, "latest"]))
            .await
    }
}

/// Decode a JSON-RPC hex quantity (`0x` prefixed).
pub fn parse_quantity(hex: &str) -> Result<U256, WalletError> {
    let digits = hex
        .strip_prefix("0x")
        .ok_or_else(|| WalletError::Rpc(format!("bad quantity: {}", hex)))?;
    if digits.is_empty() || digits.len() > 64 {
        return Err(WalletError::Rpc(format!("bad quantity: {}", hex)));
    }
    U256::from_str_radix(digits, 16).map_err(|_| WalletError::Rpc(format!("bad quantity: {}", hex)))
}

/// Query `address` against each endpoint in order and return the first
/// successful balance, formatted for display.
pub async fn fetch_balance<P>(provider: &P, endpoints: &[String], address: &str) -> Result<String, WalletError>
where
    P: BalanceProvider + ?Sized,
{
    if !is_valid_address(address) {
        return Err(WalletError::InvalidAddress(address.to_string()));
    }

    for endpoint in endpoints {
        match provider.balance_of(endpoint, address).await {
            Ok(wei) => {
                log::debug!("Balance for {} fetched from {}", address, endpoint);
                return format_balance(&wei_to_ether(wei));
            }
            Err(e) => {
                log::warn!("Failed to fetch balance from {}: {}", endpoint, e);
            }
        }
    }

    Err(WalletError::AllEndpointsFailed)
}
