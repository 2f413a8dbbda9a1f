//! Action dispatch table
//!
//! Each action kind maps to one handler that translates resolved parameters
//! into calls against the [`BlockchainClient`]. Handlers are pure translators:
//! they do not validate, retry or touch agent memory.

use agent_orchestrator_core::{
    is_native_token, ActionKind, ActionParams, BlockchainClient, Error, NetworkConfig, Result,
    TxHandle, NATIVE_TOKEN,
};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::params;

/// Per-dispatch information handlers may need
#[derive(Debug, Clone, Copy)]
pub struct DispatchContext<'a> {
    /// Agent on whose behalf the action runs
    pub agent_id: &'a str,
    /// Address the agent acts for
    pub address: &'a str,
    /// Tokens and contracts of the network
    pub network: &'a NetworkConfig,
}

/// What a dispatched action produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A transaction was submitted
    Submitted(TxHandle),
    /// The action completed without touching the chain
    OffChain,
}

impl DispatchOutcome {
    /// Transaction handle, if one was produced
    pub fn tx_handle(&self) -> Option<&TxHandle> {
        match self {
            DispatchOutcome::Submitted(handle) => Some(handle),
            DispatchOutcome::OffChain => None,
        }
    }
}

/// Routes decided actions to their handlers
#[derive(Debug, Default, Clone, Copy)]
pub struct ActionDispatcher;

impl ActionDispatcher {
    /// Create a dispatcher
    pub fn new() -> Self {
        Self
    }

    /// Dispatch an action given by name; unknown names raise [`Error::UnknownAction`]
    pub async fn dispatch_named(
        &self,
        action: &str,
        params: &ActionParams,
        ctx: DispatchContext<'_>,
        client: &dyn BlockchainClient,
    ) -> Result<DispatchOutcome> {
        let kind: ActionKind = action.parse()?;
        self.dispatch(kind, params, ctx, client).await
    }

    /// Dispatch `kind` with resolved `params`
    pub async fn dispatch(
        &self,
        kind: ActionKind,
        params: &ActionParams,
        ctx: DispatchContext<'_>,
        client: &dyn BlockchainClient,
    ) -> Result<DispatchOutcome> {
        debug!(agent_id = ctx.agent_id, action = %kind, "Dispatching action");

        let handle = match kind {
            ActionKind::None => return Ok(DispatchOutcome::OffChain),
            ActionKind::Notify => return notify(params, ctx),
            ActionKind::Transfer => transfer(params, ctx, client).await?,
            ActionKind::Swap => swap(params, ctx, client).await?,
            ActionKind::Stake => stake(params, ctx, client).await?,
            ActionKind::Unstake => unstake(params, ctx, client).await?,
            ActionKind::Claim => claim(params, ctx, client).await?,
            ActionKind::Buy => order("buy", params, ctx, client).await?,
            ActionKind::Sell => order("sell", params, ctx, client).await?,
            ActionKind::Request => request(params, ctx, client).await?,
            ActionKind::Mint => mint(params, ctx, client).await?,
        };

        info!(agent_id = ctx.agent_id, action = %kind, tx = %handle, "Action submitted");
        Ok(DispatchOutcome::Submitted(handle))
    }
}

/// Native transfer, or token transfer when `token` names a token
async fn transfer(
    params: &ActionParams,
    ctx: DispatchContext<'_>,
    client: &dyn BlockchainClient,
) -> Result<TxHandle> {
    let to = params::string(params, "to")?;
    let amount = params::number(params, "amount")?;

    match params::opt_string(params, "token") {
        Some(token) if !is_native_token(&token) => {
            let info = ctx
                .network
                .token(&token)
                .ok_or_else(|| Error::dispatch(format!("unknown token '{}'", token)))?;
            client
                .write_contract(&info.address, "transfer", &[json!(to), json!(amount)], None)
                .await
        }
        _ => client.transfer_native(&to, amount).await,
    }
}

async fn swap(
    params: &ActionParams,
    ctx: DispatchContext<'_>,
    client: &dyn BlockchainClient,
) -> Result<TxHandle> {
    let router = params::contract_address(ctx.network, params, "router", "router")?;
    let from = params::token_address(ctx.network, &params::string(params, "from_token")?);
    let to = params::token_address(ctx.network, &params::string(params, "to_token")?);
    let amount = params::number(params, "amount")?;
    let min_output = params::opt_number(params, "min_output").unwrap_or(0.0);

    client
        .write_contract(
            &router,
            "swap",
            &[json!(from), json!(to), json!(amount), json!(min_output), json!(ctx.address)],
            None,
        )
        .await
}

async fn stake(
    params: &ActionParams,
    ctx: DispatchContext<'_>,
    client: &dyn BlockchainClient,
) -> Result<TxHandle> {
    let protocol = params::contract_address(ctx.network, params, "protocol", "staking")?;
    let amount = params::number(params, "amount")?;
    let args = token_and_amount(params, ctx, amount);
    client.write_contract(&protocol, "deposit", &args, None).await
}

async fn unstake(
    params: &ActionParams,
    ctx: DispatchContext<'_>,
    client: &dyn BlockchainClient,
) -> Result<TxHandle> {
    let protocol = params::contract_address(ctx.network, params, "protocol", "staking")?;
    let amount = params::number(params, "amount")?;
    let args = token_and_amount(params, ctx, amount);
    client.write_contract(&protocol, "withdraw", &args, None).await
}

async fn claim(
    params: &ActionParams,
    ctx: DispatchContext<'_>,
    client: &dyn BlockchainClient,
) -> Result<TxHandle> {
    let protocol = params::contract_address(ctx.network, params, "protocol", "staking")?;
    client
        .write_contract(&protocol, "claimRewards", &[json!(ctx.address)], None)
        .await
}

/// Buy or sell order on the exchange contract
///
/// A sell spends `amount` of `token`. A buy spends `amount` of `pay_token`
/// (native when absent) for `token`.
async fn order(
    side: &str,
    params: &ActionParams,
    ctx: DispatchContext<'_>,
    client: &dyn BlockchainClient,
) -> Result<TxHandle> {
    let exchange = params::contract_address(ctx.network, params, "exchange", "exchange")?;
    let token = params::token_address(ctx.network, &params::string(params, "token")?);
    let amount = params::number(params, "amount")?;
    let price = params::opt_number(params, "price").map_or(Value::Null, |p| json!(p));
    let mut args = vec![json!(side), json!(token), json!(amount), price];
    if side == "buy" {
        let pay = params::opt_string(params, "pay_token")
            .unwrap_or_else(|| NATIVE_TOKEN.to_string());
        args.push(json!(params::token_address(ctx.network, &pay)));
    }

    client.write_contract(&exchange, "createOrder", &args, None).await
}

/// Payment request addressed to `from`
async fn request(
    params: &ActionParams,
    ctx: DispatchContext<'_>,
    client: &dyn BlockchainClient,
) -> Result<TxHandle> {
    let payments = params::contract_address(ctx.network, params, "contract", "payments")?;
    let from = params::string(params, "from")?;
    let amount = params::number(params, "amount")?;
    let token = params::opt_string(params, "token")
        .map(|t| params::token_address(ctx.network, &t))
        .unwrap_or_default();
    let memo = params::opt_string(params, "memo").unwrap_or_default();

    client
        .write_contract(
            &payments,
            "createRequest",
            &[json!(from), json!(amount), json!(token), json!(memo)],
            None,
        )
        .await
}

async fn mint(
    params: &ActionParams,
    ctx: DispatchContext<'_>,
    client: &dyn BlockchainClient,
) -> Result<TxHandle> {
    let collection = params::contract_address(ctx.network, params, "collection", "nft")?;
    let to = params::string(params, "to")?;
    let uri = params::opt_string(params, "token_uri").unwrap_or_default();
    let price = params::opt_number(params, "price");

    client
        .write_contract(&collection, "mint", &[json!(to), json!(uri)], price)
        .await
}

fn notify(params: &ActionParams, ctx: DispatchContext<'_>) -> Result<DispatchOutcome> {
    let message = params::string(params, "message")?;
    info!(agent_id = ctx.agent_id, "Agent notification: {}", message);
    Ok(DispatchOutcome::OffChain)
}

fn token_and_amount(params: &ActionParams, ctx: DispatchContext<'_>, amount: f64) -> Vec<Value> {
    match params::opt_string(params, "token") {
        Some(token) => vec![json!(params::token_address(ctx.network, &token)), json!(amount)],
        None => vec![json!(amount)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_orchestrator_core::testing::{ClientCall, RecordingClient};

    fn params(pairs: &[(&str, Value)]) -> ActionParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn client() -> RecordingClient {
        RecordingClient::new("0xagent", 10.0)
            .with_token("cUSD", "0xcusd", 500.0)
            .with_token("CELO", "0xcelo", 20.0)
            .with_contract("router", "0xrouter")
            .with_contract("staking", "0xstaking")
            .with_contract("exchange", "0xexchange")
            .with_contract("nft", "0xnft")
    }

    async fn run(client: &RecordingClient, kind: ActionKind, p: ActionParams) -> Result<DispatchOutcome> {
        let network = client.network.clone();
        let ctx = DispatchContext {
            agent_id: "agent-1",
            address: "0xagent",
            network: &network,
        };
        ActionDispatcher::new().dispatch(kind, &p, ctx, client).await
    }

    #[tokio::test]
    async fn test_native_and_token_transfer() -> Result<()> {
        let client = client();

        let outcome = run(
            &client,
            ActionKind::Transfer,
            params(&[("to", json!("0xbob")), ("amount", json!(1.5))]),
        )
        .await?;
        assert!(outcome.tx_handle().is_some());

        run(
            &client,
            ActionKind::Transfer,
            params(&[
                ("to", json!("0xbob")),
                ("amount", json!(3.0)),
                ("token", json!("cUSD")),
            ]),
        )
        .await?;

        let calls = client.calls();
        assert_eq!(calls[0], ClientCall::TransferNative("0xbob".to_string(), 1.5));
        assert_eq!(
            calls[1],
            ClientCall::Write(
                "0xcusd".to_string(),
                "transfer".to_string(),
                vec![json!("0xbob"), json!(3.0)],
                None
            )
        );
        Ok(())
    }

    #[tokio::test]
    async fn test_native_symbol_is_case_insensitive() -> Result<()> {
        let client = client();
        run(
            &client,
            ActionKind::Transfer,
            params(&[
                ("to", json!("0xbob")),
                ("amount", json!(2.0)),
                ("token", json!("Native")),
            ]),
        )
        .await?;
        assert_eq!(client.calls()[0], ClientCall::TransferNative("0xbob".to_string(), 2.0));
        Ok(())
    }

    #[tokio::test]
    async fn test_buy_spends_pay_token() -> Result<()> {
        let client = client();
        run(
            &client,
            ActionKind::Buy,
            params(&[
                ("token", json!("CELO")),
                ("amount", json!(5.0)),
                ("pay_token", json!("cUSD")),
            ]),
        )
        .await?;
        run(
            &client,
            ActionKind::Buy,
            params(&[("token", json!("CELO")), ("amount", json!(1.0))]),
        )
        .await?;

        let calls = client.calls();
        match (&calls[0], &calls[1]) {
            (ClientCall::Write(_, _, paid, _), ClientCall::Write(_, _, native, _)) => {
                assert_eq!(paid[4], json!("0xcusd"));
                assert_eq!(native[4], json!(NATIVE_TOKEN));
            }
            other => panic!("unexpected calls {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_swap_resolves_token_symbols() -> Result<()> {
        let client = client();
        run(
            &client,
            ActionKind::Swap,
            params(&[
                ("from_token", json!("CELO")),
                ("to_token", json!("cUSD")),
                ("amount", json!(2.0)),
            ]),
        )
        .await?;

        match &client.calls()[0] {
            ClientCall::Write(address, function, args, _) => {
                assert_eq!(address, "0xrouter");
                assert_eq!(function, "swap");
                assert_eq!(args[0], json!("0xcelo"));
                assert_eq!(args[1], json!("0xcusd"));
            }
            other => panic!("unexpected call {:?}", other),
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_notify_and_none_stay_off_chain() -> Result<()> {
        let client = client();
        let outcome = run(
            &client,
            ActionKind::Notify,
            params(&[("message", json!("balance low"))]),
        )
        .await?;
        assert_eq!(outcome, DispatchOutcome::OffChain);
        assert_eq!(run(&client, ActionKind::None, ActionParams::new()).await?, DispatchOutcome::OffChain);
        assert!(client.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_unknown_action_name() {
        let client = client();
        let network = client.network.clone();
        let ctx = DispatchContext {
            agent_id: "agent-1",
            address: "0xagent",
            network: &network,
        };
        let result = ActionDispatcher::new()
            .dispatch_named("liquidate", &ActionParams::new(), ctx, &client)
            .await;
        assert!(matches!(result, Err(Error::UnknownAction(name)) if name == "liquidate"));
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_contract_is_dispatch_error() {
        let client = RecordingClient::new("0xagent", 10.0);
        let result = run(
            &client,
            ActionKind::Stake,
            params(&[("amount", json!(1.0))]),
        )
        .await;
        assert!(matches!(result, Err(Error::Dispatch(_))));
    }

    #[tokio::test]
    async fn test_client_failure_surfaces() {
        let client = client().failing_writes();
        let result = run(
            &client,
            ActionKind::Claim,
            ActionParams::new(),
        )
        .await;
        assert!(matches!(result, Err(Error::Dispatch(_))));
        assert_eq!(client.write_count(), 1);
    }
}
