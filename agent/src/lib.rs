//! Agent Decision and Execution Library
//!
//! This library provides the decision engine and the agent execution engine
//! of the autonomous agent orchestrator. It turns an agent's observed on-chain
//! state and rolling memory into decisions, validates them, dispatches them
//! through the action table and records their outcomes.
//!
//! # Features
//!
//! - **Trigger Catalog**: Threshold, schedule, event, pattern and model-driven
//!   triggers, each enabled/disabled and prioritized
//! - **Rule Catalog**: Weighted conditions scored per cycle and action
//!   templates with parameter synthesis
//! - **Scoring Models**: Small deterministic classification, regression,
//!   clustering and anomaly detection models
//! - **Decision Providers**: Rule-based by default, replaceable by any
//!   implementation of [`DecisionProvider`]
//! - **Execution Engine**: Agent registry, per-agent serialized cycles,
//!   local validation and bounded memory
//! - **Policy Files**: YAML documents loading catalogs and agents
//! - **Metrics** (feature `metrics`): Prometheus counters per cycle outcome
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use agent_orchestrator_agent::prelude::*;
//! use agent_orchestrator_core::{AgentConfig, BlockchainClient, OrchestratorConfig};
//! use serde_json::json;
//!
//! async fn run(client: Arc<dyn BlockchainClient>) -> agent_orchestrator_core::Result<()> {
//!     let engine = AgentExecutionEngine::new(client, &OrchestratorConfig::default())?;
//!
//!     engine.add_trigger(Trigger::new(
//!         "low-cusd",
//!         "Low cUSD balance",
//!         TriggerConfig::Threshold {
//!             metric: Metric::Balance,
//!             operator: Comparison::Lt,
//!             value: 1000.0,
//!             token: Some("cUSD".to_string()),
//!         },
//!     ))?;
//!     engine.add_rule(DecisionRule::new(
//!         "alert",
//!         "Alert operator",
//!         "low-cusd",
//!         ActionTemplate::new(ActionKind::Notify).with_param("message", json!("cUSD low")),
//!     ))?;
//!
//!     engine.register_agent("treasurer", AgentConfig::new("keep cUSD above 1000")).await?;
//!     let result = engine.execute_agent("treasurer").await?;
//!     println!("{} executed: {}", result.action, result.executed);
//!     Ok(())
//! }
//! ```
//!
//! # Decision Cycle
//!
//! Each cycle moves the agent through
//! `idle → observing → deciding → validating → executing | skipped | rejected → recording → idle`.
//! Failures are recorded in memory as `error` actions and reported in the
//! returned [`ExecutionResult`](agent_orchestrator_core::ExecutionResult);
//! only an unregistered agent is an error.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod catalog;
pub mod context;
pub mod decision;
pub mod engine;
pub mod error;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod model;
pub mod phase;
pub mod policy;
pub mod provider;
pub mod risk;
pub mod rule;
pub mod store;
pub mod trigger;
pub mod validation;

#[cfg(test)]
mod test_support;

// Re-exports for convenience
pub use catalog::Catalog;
pub use context::EvaluationContext;
pub use decision::{DecisionEngine, ScoredRule, NO_RULE_REASONING};
pub use engine::AgentExecutionEngine;
pub use error::{EvalError, EvalResult};
pub use model::{ModelKind, Prediction, ScoringModel};
pub use phase::{CycleEvent, CyclePhase};
pub use policy::PolicyFile;
pub use provider::{DecisionProvider, RuleBasedProvider};
pub use rule::{ActionTemplate, DecisionCondition, DecisionRule, ParamTemplate, SynthesisHint};
pub use store::MemoryStore;
pub use trigger::{Comparison, Metric, ScheduleInterval, Trigger, TriggerConfig, TriggerKind};

#[cfg(feature = "metrics")]
pub use metrics::{CycleOutcome, EngineMetrics};

/// Prelude module for easy importing of common types
pub mod prelude {
    pub use super::{
        ActionTemplate, AgentExecutionEngine, Catalog, Comparison, CyclePhase, DecisionCondition,
        DecisionEngine, DecisionProvider, DecisionRule, EvaluationContext, Metric, ModelKind,
        PolicyFile, RuleBasedProvider, ScheduleInterval, ScoringModel, SynthesisHint, Trigger,
        TriggerConfig,
    };
    pub use agent_orchestrator_core::ActionKind;
}

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// Library name
pub const NAME: &str = "agent-orchestrator-agent";
