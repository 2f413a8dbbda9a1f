//! Blockchain client capability
//!
//! The orchestrator never talks to a chain directly. Every read and write goes
//! through [`BlockchainClient`], an opaque capability supplied by the caller.
//! Implementations are expected to return real responses; the orchestrator
//! never synthesizes a successful transaction on its own.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Handle of a submitted transaction (hash or signature)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxHandle(pub String);

impl TxHandle {
    /// Create a handle from its string form
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// String form of the handle
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Contract event emitted by a transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChainEvent {
    /// Emitting contract
    pub contract: String,
    /// Event name
    pub name: String,
    /// Decoded event fields
    #[serde(default)]
    pub fields: BTreeMap<String, Value>,
    /// Block time of the event
    pub timestamp: DateTime<Utc>,
}

/// Summary of a historical transaction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionSummary {
    /// Transaction hash or signature
    pub hash: String,
    /// Sender, when known
    pub from: Option<String>,
    /// Recipient, when known
    pub to: Option<String>,
    /// Value moved, when known
    pub value: Option<f64>,
    /// Block time
    pub timestamp: DateTime<Utc>,
    /// Whether the transaction succeeded
    pub success: bool,
    /// Events emitted by the transaction
    #[serde(default)]
    pub events: Vec<ChainEvent>,
}

/// Token known to the network configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenInfo {
    /// Token contract / mint address
    pub address: String,
    /// Decimal places of the base unit
    pub decimals: u8,
}

/// Tokens and named contracts of the connected network
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Tokens by symbol
    pub tokens: BTreeMap<String, TokenInfo>,
    /// Contracts by role name (`router`, `staking`, `oracle`, ...)
    pub contracts: BTreeMap<String, String>,
}

impl NetworkConfig {
    /// Address of the contract registered under `role`
    pub fn contract(&self, role: &str) -> Option<&str> {
        self.contracts.get(role).map(String::as_str)
    }

    /// Token info for `symbol`
    pub fn token(&self, symbol: &str) -> Option<&TokenInfo> {
        self.tokens.get(symbol)
    }
}

/// Minimal surface the orchestrator needs from a blockchain
#[async_trait]
pub trait BlockchainClient: Send + Sync {
    /// Native balance of `address`, in whole units
    async fn get_native_balance(&self, address: &str) -> Result<f64>;

    /// Balance of `token_address` held by `address`, in whole units
    async fn get_token_balance(&self, token_address: &str, address: &str) -> Result<f64>;

    /// Most recent transactions of `address`, newest first
    async fn get_transaction_history(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TransactionSummary>>;

    /// Call a read-only contract function
    async fn read_contract(&self, address: &str, function: &str, args: &[Value]) -> Result<Value>;

    /// Submit a state-changing contract call, optionally attaching native value
    async fn write_contract(
        &self,
        address: &str,
        function: &str,
        args: &[Value],
        value: Option<f64>,
    ) -> Result<TxHandle>;

    /// Send native currency to `to`
    async fn transfer_native(&self, to: &str, amount: f64) -> Result<TxHandle>;

    /// Addresses controlled by this client
    async fn get_addresses(&self) -> Result<Vec<String>>;

    /// Tokens and contracts of the connected network
    async fn get_network_config(&self) -> Result<NetworkConfig>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_config_lookup() {
        let mut config = NetworkConfig::default();
        config.contracts.insert("router".to_string(), "0xrouter".to_string());
        config.tokens.insert(
            "cUSD".to_string(),
            TokenInfo {
                address: "0xcusd".to_string(),
                decimals: 18,
            },
        );
        assert_eq!(config.contract("router"), Some("0xrouter"));
        assert_eq!(config.contract("staking"), None);
        assert_eq!(config.token("cUSD").map(|t| t.decimals), Some(18));
    }

    #[test]
    fn test_tx_handle_is_transparent() {
        let handle = TxHandle::new("0xdeadbeef");
        let json = serde_json::to_string(&handle).unwrap();
        assert_eq!(json, "\"0xdeadbeef\"");
        assert_eq!(handle.to_string(), "0xdeadbeef");
    }
}
