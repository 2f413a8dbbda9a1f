//! Solana implementation of the blockchain client capability
//!
//! [`SolanaClient`] implements [`BlockchainClient`] over the nonblocking
//! Solana RPC client with:
//! - Priority-ordered endpoints and automatic failover for reads
//! - Endpoint health tracking
//! - Native transfers in SOL and SPL token transfers between associated
//!   accounts, creating the recipient's account when it does not exist yet
//! - Program writes encoded as an 8-byte function discriminator followed by
//!   the JSON-encoded arguments
//!
//! Writes are sent once to the current endpoint and never retried here.
//!
//! # Example
//!
//! ```no_run
//! use agent_orchestrator_core::config::OrchestratorConfig;
//! use agent_orchestrator_core::rpc::SolanaClient;
//!
//! # async fn run() -> agent_orchestrator_core::Result<()> {
//! let config = OrchestratorConfig::from_file("orchestrator.yaml")?;
//! let client = SolanaClient::from_settings(&config.chain)?;
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use solana_client::client_error::ClientError as SolanaClientError;
use solana_client::nonblocking::rpc_client::RpcClient as SolanaRpcClient;
use solana_sdk::{
    commitment_config::CommitmentConfig,
    instruction::{AccountMeta, Instruction},
    native_token::{lamports_to_sol, sol_to_lamports},
    pubkey::Pubkey,
    signature::{read_keypair_file, Keypair, Signer},
    system_instruction,
    transaction::Transaction,
};
use spl_associated_token_account::{
    get_associated_token_address, instruction::create_associated_token_account,
};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::client::{BlockchainClient, NetworkConfig, TransactionSummary, TxHandle};
use crate::config::{ChainSettings, CommitmentLevel, RpcEndpoint};
use crate::error::{Error, Result};

/// Consecutive failures after which an endpoint is skipped
const MAX_CONSECUTIVE_FAILURES: u32 = 3;

type RpcFuture<'a, T> = Pin<Box<dyn Future<Output = std::result::Result<T, SolanaClientError>> + Send + 'a>>;

impl CommitmentLevel {
    /// Convert to Solana SDK commitment config
    pub fn to_solana_commitment(&self) -> CommitmentConfig {
        match self {
            CommitmentLevel::Processed => CommitmentConfig::processed(),
            CommitmentLevel::Confirmed => CommitmentConfig::confirmed(),
            CommitmentLevel::Finalized => CommitmentConfig::finalized(),
        }
    }
}

/// Endpoint health tracking
#[derive(Debug, Clone)]
struct EndpointHealth {
    consecutive_failures: u32,
    total_requests: u64,
    total_errors: u64,
}

impl EndpointHealth {
    fn new() -> Self {
        Self {
            consecutive_failures: 0,
            total_requests: 0,
            total_errors: 0,
        }
    }

    fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.total_requests += 1;
    }

    fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        self.total_requests += 1;
        self.total_errors += 1;
    }

    fn is_healthy(&self) -> bool {
        self.consecutive_failures < MAX_CONSECUTIVE_FAILURES
    }
}

struct Endpoint {
    url: String,
    client: SolanaRpcClient,
    health: Mutex<EndpointHealth>,
}

/// Blockchain client backed by Solana RPC endpoints
pub struct SolanaClient {
    endpoints: Vec<Endpoint>,
    payer: Arc<Keypair>,
    network: NetworkConfig,
}

impl SolanaClient {
    /// Create a client over `endpoints` signing with `payer`
    pub fn new(
        endpoints: &[RpcEndpoint],
        timeout: Duration,
        commitment: CommitmentLevel,
        payer: Keypair,
        network: NetworkConfig,
    ) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(Error::config("No RPC endpoints configured"));
        }

        let mut ordered = endpoints.to_vec();
        ordered.sort_by_key(|endpoint| endpoint.priority);

        let endpoints = ordered
            .into_iter()
            .map(|endpoint| Endpoint {
                client: SolanaRpcClient::new_with_timeout_and_commitment(
                    endpoint.url.clone(),
                    timeout,
                    commitment.to_solana_commitment(),
                ),
                url: endpoint.url,
                health: Mutex::new(EndpointHealth::new()),
            })
            .collect::<Vec<_>>();

        info!("Created Solana client with {} endpoints", endpoints.len());

        Ok(Self {
            endpoints,
            payer: Arc::new(payer),
            network,
        })
    }

    /// Create a client from chain settings, reading the keypair file
    pub fn from_settings(settings: &ChainSettings) -> Result<Self> {
        let path = settings
            .keypair_path
            .as_ref()
            .ok_or_else(|| Error::config("chain.keypair_path is required for the Solana client"))?;
        let payer = read_keypair_file(path)
            .map_err(|e| Error::config(format!("Failed to read keypair {}: {}", path.display(), e)))?;

        Self::new(
            &settings.endpoints,
            Duration::from_secs(settings.timeout_seconds),
            settings.commitment,
            payer,
            settings.network.clone(),
        )
    }

    /// Public key of the signing keypair
    pub fn payer(&self) -> Pubkey {
        self.payer.pubkey()
    }

    /// Run a read against healthy endpoints in priority order
    async fn read_with_failover<T, F>(&self, op: F) -> Result<T>
    where
        F: for<'c> Fn(&'c SolanaRpcClient) -> RpcFuture<'c, T>,
    {
        let mut last_error = None;

        for endpoint in &self.endpoints {
            if !endpoint.health.lock().await.is_healthy() {
                continue;
            }

            match op(&endpoint.client).await {
                Ok(value) => {
                    endpoint.health.lock().await.record_success();
                    return Ok(value);
                }
                Err(err) => {
                    warn!("RPC read failed on {}: {}", endpoint.url, err);
                    endpoint.health.lock().await.record_failure();
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(err) => Err(Error::client(format!("All endpoints failed. Last error: {}", err))),
            None => Err(Error::client("No healthy endpoints available")),
        }
    }

    /// Endpoint used for writes: the first healthy one, else the primary
    async fn write_endpoint(&self) -> &Endpoint {
        for endpoint in &self.endpoints {
            if endpoint.health.lock().await.is_healthy() {
                return endpoint;
            }
        }
        &self.endpoints[0]
    }

    #[instrument(skip(self, instructions))]
    async fn send(&self, instructions: Vec<Instruction>) -> Result<TxHandle> {
        let endpoint = self.write_endpoint().await;
        let blockhash = endpoint
            .client
            .get_latest_blockhash()
            .await
            .map_err(|e| Error::dispatch(format!("Failed to fetch blockhash: {}", e)))?;

        let payer = self.payer.as_ref();
        let transaction = Transaction::new_signed_with_payer(
            &instructions,
            Some(&payer.pubkey()),
            &[payer],
            blockhash,
        );

        match endpoint.client.send_and_confirm_transaction(&transaction).await {
            Ok(signature) => {
                endpoint.health.lock().await.record_success();
                debug!("Transaction confirmed: {}", signature);
                Ok(TxHandle::new(signature.to_string()))
            }
            Err(err) => {
                endpoint.health.lock().await.record_failure();
                Err(Error::dispatch(format!("Transaction failed: {}", err)))
            }
        }
    }

    fn token_by_address(&self, address: &str) -> Option<u8> {
        self.network
            .tokens
            .values()
            .find(|token| token.address == address)
            .map(|token| token.decimals)
    }

    /// Instructions moving tokens of `mint` to `args[0]`, amount `args[1]`
    async fn token_transfer(
        &self,
        mint: &Pubkey,
        decimals: u8,
        args: &[Value],
    ) -> Result<Vec<Instruction>> {
        let to = args
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| Error::dispatch("token transfer requires a recipient argument"))
            .and_then(parse_pubkey)?;
        let amount = args
            .get(1)
            .and_then(Value::as_f64)
            .ok_or_else(|| Error::dispatch("token transfer requires an amount argument"))?;

        let destination = get_associated_token_address(&to, mint);
        let existing = self
            .read_with_failover(move |client| {
                Box::pin(async move {
                    client
                        .get_account_with_commitment(&destination, client.commitment())
                        .await
                })
            })
            .await?;
        let create = existing.value.is_none();
        if create {
            debug!("Creating token account {} for {}", destination, to);
        }

        token_transfer_instructions(&self.payer.pubkey(), &to, mint, decimals, amount, create)
    }
}

/// Optional creation of the recipient's associated account, then the transfer
fn token_transfer_instructions(
    owner: &Pubkey,
    to: &Pubkey,
    mint: &Pubkey,
    decimals: u8,
    amount: f64,
    create_destination: bool,
) -> Result<Vec<Instruction>> {
    let token_program = spl_token::id();
    let source = get_associated_token_address(owner, mint);
    let destination = get_associated_token_address(to, mint);
    let base_units = (amount * 10f64.powi(i32::from(decimals))).round() as u64;

    let mut instructions = Vec::with_capacity(2);
    if create_destination {
        instructions.push(create_associated_token_account(owner, to, mint, &token_program));
    }
    instructions.push(
        spl_token::instruction::transfer_checked(
            &token_program,
            &source,
            mint,
            &destination,
            owner,
            &[],
            base_units,
            decimals,
        )
        .map_err(|e| Error::dispatch(format!("Failed to build token transfer: {}", e)))?,
    );
    Ok(instructions)
}

#[async_trait]
impl BlockchainClient for SolanaClient {
    async fn get_native_balance(&self, address: &str) -> Result<f64> {
        let pubkey = parse_pubkey(address)?;
        let lamports = self
            .read_with_failover(move |client| Box::pin(async move { client.get_balance(&pubkey).await }))
            .await?;
        Ok(lamports_to_sol(lamports))
    }

    async fn get_token_balance(&self, token_address: &str, address: &str) -> Result<f64> {
        let mint = parse_pubkey(token_address)?;
        let owner = parse_pubkey(address)?;
        let account = get_associated_token_address(&owner, &mint);

        let result = self
            .read_with_failover(move |client| {
                Box::pin(async move { client.get_token_account_balance(&account).await })
            })
            .await;

        match result {
            Ok(amount) => Ok(amount.ui_amount.unwrap_or(0.0)),
            // A missing associated account holds nothing
            Err(err) if err.to_string().contains("could not find account") => Ok(0.0),
            Err(err) => Err(err),
        }
    }

    async fn get_transaction_history(
        &self,
        address: &str,
        limit: usize,
    ) -> Result<Vec<TransactionSummary>> {
        let pubkey = parse_pubkey(address)?;
        let statuses = self
            .read_with_failover(move |client| {
                Box::pin(async move { client.get_signatures_for_address(&pubkey).await })
            })
            .await?;

        Ok(statuses
            .into_iter()
            .take(limit)
            .map(|status| TransactionSummary {
                hash: status.signature,
                from: None,
                to: None,
                value: None,
                timestamp: status
                    .block_time
                    .and_then(|t| Utc.timestamp_opt(t, 0).single())
                    .unwrap_or_else(Utc::now),
                success: status.err.is_none(),
                events: Vec::new(),
            })
            .collect())
    }

    /// Solana programs have no view functions: the account at `address` is
    /// read, decoded as JSON when possible, and `function` (when non-empty)
    /// selects a field of the decoded object.
    async fn read_contract(&self, address: &str, function: &str, _args: &[Value]) -> Result<Value> {
        let pubkey = parse_pubkey(address)?;
        let data = self
            .read_with_failover(move |client| {
                Box::pin(async move { client.get_account_data(&pubkey).await })
            })
            .await?;

        let decoded: Value = serde_json::from_slice(&data)
            .unwrap_or_else(|_| Value::Array(data.into_iter().map(Value::from).collect()));

        if function.is_empty() {
            return Ok(decoded);
        }
        decoded
            .get(function)
            .cloned()
            .ok_or_else(|| Error::client(format!("Account {} has no field '{}'", address, function)))
    }

    async fn write_contract(
        &self,
        address: &str,
        function: &str,
        args: &[Value],
        value: Option<f64>,
    ) -> Result<TxHandle> {
        if value.map_or(false, |v| v > 0.0) {
            return Err(Error::dispatch(
                "Native value cannot be attached to Solana program calls",
            ));
        }

        let program = parse_pubkey(address)?;

        let instructions = match (function, self.token_by_address(address)) {
            ("transfer", Some(decimals)) => self.token_transfer(&program, decimals, args).await?,
            _ => vec![program_instruction(&program, &self.payer.pubkey(), function, args)?],
        };

        self.send(instructions).await
    }

    async fn transfer_native(&self, to: &str, amount: f64) -> Result<TxHandle> {
        let recipient = parse_pubkey(to)?;
        let instruction =
            system_instruction::transfer(&self.payer.pubkey(), &recipient, sol_to_lamports(amount));
        self.send(vec![instruction]).await
    }

    async fn get_addresses(&self) -> Result<Vec<String>> {
        Ok(vec![self.payer.pubkey().to_string()])
    }

    async fn get_network_config(&self) -> Result<NetworkConfig> {
        Ok(self.network.clone())
    }
}

fn parse_pubkey(address: &str) -> Result<Pubkey> {
    Pubkey::from_str(address)
        .map_err(|e| Error::client(format!("Invalid address '{}': {}", address, e)))
}

/// First 8 bytes of `sha256("global:<function>")`
fn function_discriminator(function: &str) -> [u8; 8] {
    let digest = Sha256::digest(format!("global:{}", function).as_bytes());
    let mut out = [0u8; 8];
    out.copy_from_slice(&digest[..8]);
    out
}

/// Program call with the payer as signer and every address-like argument as a writable account
fn program_instruction(
    program: &Pubkey,
    payer: &Pubkey,
    function: &str,
    args: &[Value],
) -> Result<Instruction> {
    let mut data = function_discriminator(function).to_vec();
    data.extend(serde_json::to_vec(args)?);

    let mut accounts = vec![AccountMeta::new(*payer, true)];
    accounts.extend(
        args.iter()
            .filter_map(Value::as_str)
            .filter_map(|s| Pubkey::from_str(s).ok())
            .map(|key| AccountMeta::new(key, false)),
    );

    Ok(Instruction::new_with_bytes(*program, &data, accounts))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_health_calculation() {
        let mut health = EndpointHealth::new();
        assert!(health.is_healthy());

        for _ in 0..MAX_CONSECUTIVE_FAILURES {
            health.record_failure();
        }
        assert!(!health.is_healthy());
        assert_eq!(health.total_errors, MAX_CONSECUTIVE_FAILURES as u64);

        health.record_success();
        assert!(health.is_healthy());
    }

    #[test]
    fn test_discriminator_is_stable() {
        assert_eq!(function_discriminator("stake"), function_discriminator("stake"));
        assert_ne!(function_discriminator("stake"), function_discriminator("unstake"));
    }

    #[test]
    fn test_program_instruction_accounts() {
        let program = Pubkey::new_unique();
        let payer = Pubkey::new_unique();
        let pool = Pubkey::new_unique();
        let args = vec![Value::from(pool.to_string()), Value::from(2.5)];

        let instruction = program_instruction(&program, &payer, "deposit", &args).unwrap();
        assert_eq!(instruction.program_id, program);
        assert_eq!(instruction.accounts.len(), 2);
        assert!(instruction.accounts[0].is_signer);
        assert_eq!(instruction.accounts[1].pubkey, pool);
        assert_eq!(&instruction.data[..8], &function_discriminator("deposit"));
    }

    #[test]
    fn test_token_transfer_creates_missing_recipient_account() {
        let owner = Pubkey::new_unique();
        let to = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let destination = get_associated_token_address(&to, &mint);

        let fresh = token_transfer_instructions(&owner, &to, &mint, 6, 1.5, true).unwrap();
        assert_eq!(fresh.len(), 2);
        assert_eq!(fresh[0].program_id, spl_associated_token_account::id());
        assert!(fresh[0].accounts.iter().any(|meta| meta.pubkey == destination));
        assert_eq!(fresh[1].program_id, spl_token::id());
        assert_eq!(fresh[1].accounts[2].pubkey, destination);

        let existing = token_transfer_instructions(&owner, &to, &mint, 6, 1.5, false).unwrap();
        assert_eq!(existing.len(), 1);
        assert_eq!(existing[0].accounts[0].pubkey, get_associated_token_address(&owner, &mint));
    }

    #[test]
    fn test_rejects_empty_endpoints() {
        let result = SolanaClient::new(
            &[],
            Duration::from_secs(1),
            CommitmentLevel::Confirmed,
            Keypair::new(),
            NetworkConfig::default(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
