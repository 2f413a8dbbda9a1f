//! Test doubles for the blockchain client capability
//!
//! [`RecordingClient`] answers reads from canned data and records every call,
//! so tests can assert on what a decision cycle read and dispatched.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::client::{BlockchainClient, NetworkConfig, TokenInfo, TransactionSummary, TxHandle};
use crate::error::{Error, Result};

/// One recorded client call
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCall {
    /// `get_native_balance`
    NativeBalance(String),
    /// `get_token_balance`
    TokenBalance(String, String),
    /// `get_transaction_history`
    History(String, usize),
    /// `read_contract`
    Read(String, String, Vec<Value>),
    /// `write_contract`
    Write(String, String, Vec<Value>, Option<f64>),
    /// `transfer_native`
    TransferNative(String, f64),
}

impl ClientCall {
    /// Whether the call changes chain state
    pub fn is_write(&self) -> bool {
        matches!(self, ClientCall::Write(..) | ClientCall::TransferNative(..))
    }
}

/// Blockchain client that serves canned data and records calls
#[derive(Debug, Default)]
pub struct RecordingClient {
    /// Address returned by `get_addresses`
    pub address: String,
    /// Native balance served for every address
    pub native_balance: f64,
    /// Token balances by token address
    pub token_balances: BTreeMap<String, f64>,
    /// History served for every address
    pub history: Vec<TransactionSummary>,
    /// Responses of `read_contract` by `address/function`
    pub reads: BTreeMap<String, Value>,
    /// Network configuration
    pub network: NetworkConfig,
    /// Make every write fail with a dispatch error
    pub fail_writes: bool,
    /// Make every native balance read fail
    pub fail_reads: bool,
    /// Addresses whose native balance reads fail
    pub unreachable: BTreeSet<String>,
    /// Delay before each native balance read answers
    pub read_latency: Option<Duration>,
    calls: Mutex<Vec<ClientCall>>,
    tx_counter: AtomicUsize,
}

impl RecordingClient {
    /// Client for `address` with the given native balance
    pub fn new(address: impl Into<String>, native_balance: f64) -> Self {
        Self {
            address: address.into(),
            native_balance,
            ..Self::default()
        }
    }

    /// Register a token and its balance
    pub fn with_token(mut self, symbol: &str, address: &str, balance: f64) -> Self {
        self.network.tokens.insert(
            symbol.to_string(),
            TokenInfo {
                address: address.to_string(),
                decimals: 18,
            },
        );
        self.token_balances.insert(address.to_string(), balance);
        self
    }

    /// Register a named contract
    pub fn with_contract(mut self, role: &str, address: &str) -> Self {
        self.network.contracts.insert(role.to_string(), address.to_string());
        self
    }

    /// Serve `value` for reads of `function` on `address`
    pub fn with_read(mut self, address: &str, function: &str, value: Value) -> Self {
        self.reads.insert(format!("{}/{}", address, function), value);
        self
    }

    /// Fail every write
    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// Fail native balance reads for `address` only
    pub fn unreachable_address(mut self, address: &str) -> Self {
        self.unreachable.insert(address.to_string());
        self
    }

    /// Delay every native balance read by `latency`
    pub fn with_read_latency(mut self, latency: Duration) -> Self {
        self.read_latency = Some(latency);
        self
    }

    /// All recorded calls
    pub fn calls(&self) -> Vec<ClientCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of state-changing calls
    pub fn write_count(&self) -> usize {
        self.calls().iter().filter(|c| c.is_write()).count()
    }

    fn record(&self, call: ClientCall) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn next_tx(&self) -> TxHandle {
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst);
        TxHandle::new(format!("0xtx{:04}", n))
    }
}

#[async_trait]
impl BlockchainClient for RecordingClient {
    async fn get_native_balance(&self, address: &str) -> Result<f64> {
        self.record(ClientCall::NativeBalance(address.to_string()));
        if let Some(latency) = self.read_latency {
            tokio::time::sleep(latency).await;
        }
        if self.fail_reads || self.unreachable.contains(address) {
            return Err(Error::client("node unavailable"));
        }
        Ok(self.native_balance)
    }

    async fn get_token_balance(&self, token_address: &str, address: &str) -> Result<f64> {
        self.record(ClientCall::TokenBalance(
            token_address.to_string(),
            address.to_string(),
        ));
        Ok(self.token_balances.get(token_address).copied().unwrap_or(0.0))
    }

    async fn get_transaction_history(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TransactionSummary>> {
        self.record(ClientCall::History(address.to_string(), limit));
        Ok(self.history.iter().take(limit).cloned().collect())
    }

    async fn read_contract(&self, address: &str, function: &str, args: &[Value]) -> Result<Value> {
        self.record(ClientCall::Read(
            address.to_string(),
            function.to_string(),
            args.to_vec(),
        ));
        self.reads
            .get(&format!("{}/{}", address, function))
            .cloned()
            .ok_or_else(|| Error::client(format!("no data for {}/{}", address, function)))
    }

    async fn write_contract(
        &self,
        address: &str,
        function: &str,
        args: &[Value],
        value: Option<f64>,
    ) -> Result<TxHandle> {
        self.record(ClientCall::Write(
            address.to_string(),
            function.to_string(),
            args.to_vec(),
            value,
        ));
        if self.fail_writes {
            return Err(Error::dispatch("execution reverted"));
        }
        Ok(self.next_tx())
    }

    async fn transfer_native(&self, to: &str, amount: f64) -> Result<TxHandle> {
        self.record(ClientCall::TransferNative(to.to_string(), amount));
        if self.fail_writes {
            return Err(Error::dispatch("insufficient gas"));
        }
        Ok(self.next_tx())
    }

    async fn get_addresses(&self) -> Result<Vec<String>> {
        Ok(vec![self.address.clone()])
    }

    async fn get_network_config(&self) -> Result<NetworkConfig> {
        Ok(self.network.clone())
    }
}
