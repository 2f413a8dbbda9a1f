//! Action Dispatch Table for the Agent Orchestrator
//!
//! This library maps every decided action kind to the blockchain calls that
//! carry it out. The set of actions is closed: dispatch is an exhaustive match,
//! so adding an action kind without a handler does not compile.
//!
//! # Supported Actions
//!
//! | Action     | Call                                                     |
//! |------------|----------------------------------------------------------|
//! | `transfer` | `transfer_native`, or token `transfer(to, amount)`       |
//! | `swap`     | router `swap(from, to, amount, min_output, recipient)`   |
//! | `stake`    | staking `deposit([token], amount)`                       |
//! | `unstake`  | staking `withdraw([token], amount)`                      |
//! | `claim`    | staking `claimRewards(address)`                          |
//! | `buy`      | exchange `createOrder("buy", token, amount, price)`      |
//! | `sell`     | exchange `createOrder("sell", token, amount, price)`     |
//! | `request`  | payments `createRequest(from, amount, token, memo)`      |
//! | `mint`     | nft `mint(to, token_uri)`                                |
//! | `notify`   | off-chain, logged                                        |
//! | `none`     | nothing                                                  |
//!
//! Contract roles (`router`, `staking`, ...) resolve through the client's
//! [`NetworkConfig`](agent_orchestrator_core::NetworkConfig); a parameter may
//! name a different role or a literal address.
//!
//! # Quick Start
//!
//! ```no_run
//! use agent_orchestrator_dapp::prelude::*;
//! use agent_orchestrator_core::{ActionKind, ActionParams, BlockchainClient};
//!
//! async fn pay(client: &dyn BlockchainClient) -> agent_orchestrator_core::Result<()> {
//!     let network = client.get_network_config().await?;
//!     let mut params = ActionParams::new();
//!     params.insert("to".into(), serde_json::json!("0xbob"));
//!     params.insert("amount".into(), serde_json::json!(1.0));
//!
//!     let ctx = DispatchContext { agent_id: "treasurer", address: "0xagent", network: &network };
//!     let outcome = ActionDispatcher::new()
//!         .dispatch(ActionKind::Transfer, &params, ctx, client)
//!         .await?;
//!     println!("{:?}", outcome.tx_handle());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod dispatch;
pub mod params;

// Re-exports for convenience
pub use dispatch::{ActionDispatcher, DispatchContext, DispatchOutcome};

/// Prelude module for easy importing of common types
pub mod prelude {
    pub use super::{ActionDispatcher, DispatchContext, DispatchOutcome};
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Library name
pub const NAME: &str = "agent-orchestrator-dapp";
