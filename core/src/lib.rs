//! Agent Orchestrator Core Library
//!
//! This library provides the shared foundation of the autonomous agent
//! orchestrator: the error taxonomy, the agent data model, configuration, and
//! the blockchain client capability every decision cycle reads from and
//! dispatches to.
//!
//! # Features
//!
//! - **Data Model**: Agent configuration, bounded agent memory, observed state,
//!   decisions and execution results
//! - **Blockchain Capability**: A minimal async trait the engine calls but
//!   never implements
//! - **Configuration**: YAML/JSON configuration with defaults and a builder
//! - **Solana Adapter** (feature `solana`): RPC-backed implementation of the
//!   blockchain capability with endpoint failover
//!
//! # Quick Start
//!
//! ```no_run
//! use agent_orchestrator_core::prelude::*;
//! use chrono::Utc;
//!
//! let mut memory = AgentMemory::new("treasurer", Utc::now(), MemoryLimits::default());
//! memory.push_learning("swap succeeded with confidence 0.92");
//! assert_eq!(memory.learnings.len(), 1);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod client;
pub mod config;
pub mod error;
#[cfg(feature = "solana")]
pub mod rpc;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;

// Re-exports for convenience
pub use client::{BlockchainClient, ChainEvent, NetworkConfig, TokenInfo, TransactionSummary, TxHandle};
pub use config::OrchestratorConfig;
pub use error::{Error, Result};
pub use types::{
    ActionKind, ActionParams, ActionRecord, AgentConfig, AgentConfigUpdate, AgentId, AgentMemory,
    is_native_token, Decision, ExecutionMode, ExecutionResult, MemoryLimits, Observation,
    ObservedState, SpendingLimits, NATIVE_TOKEN,
};

#[cfg(feature = "solana")]
pub use rpc::SolanaClient;

/// Prelude module for easy importing of common types
pub mod prelude {
    pub use super::{
        ActionKind, ActionParams, ActionRecord, AgentConfig, AgentConfigUpdate, AgentId,
        AgentMemory, BlockchainClient, ChainEvent, Decision, Error, ExecutionMode,
        ExecutionResult, MemoryLimits, NetworkConfig, Observation, ObservedState,
        OrchestratorConfig, Result, SpendingLimits, TransactionSummary, TxHandle,
    };
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Library name
pub const NAME: &str = "agent-orchestrator-core";
