//! Simple Agent Example
//!
//! This example registers one agent with a low-balance rule and runs a few
//! decision cycles against an in-memory blockchain client.

use std::sync::Arc;

use agent_orchestrator_agent::prelude::*;
use agent_orchestrator_core::testing::RecordingClient;
use agent_orchestrator_core::{AgentConfig, OrchestratorConfig, SpendingLimits};
use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber_init();
    println!("Starting simple agent example...");

    // Wallet with 5 native units and 250 cUSD
    let client = Arc::new(
        RecordingClient::new("0xagent", 5.0)
            .with_token("cUSD", "0xcusd", 250.0)
            .with_contract("router", "0xrouter"),
    );
    let engine = AgentExecutionEngine::new(client.clone(), &OrchestratorConfig::default())?;

    engine.add_trigger(Trigger::new(
        "low-cusd",
        "cUSD below 1000",
        TriggerConfig::Threshold {
            metric: Metric::Balance,
            operator: Comparison::Lt,
            value: 1000.0,
            token: Some("cUSD".to_string()),
        },
    ))?;
    engine.add_rule(DecisionRule::new(
        "top-up",
        "Swap native into cUSD",
        "low-cusd",
        ActionTemplate::new(ActionKind::Swap)
            .with_param("from_token", serde_json::json!("native"))
            .with_param("to_token", serde_json::json!("cUSD"))
            .with_hint("amount", SynthesisHint::OptimalAmount),
    ))?;

    let config = AgentConfig {
        spending_limits: SpendingLimits {
            daily: 2.0,
            per_tx: 1.0,
        },
        ..AgentConfig::new("keep cUSD above 1000")
    };
    engine.register_agent("treasurer", config).await?;

    for cycle in 1..=3 {
        let result = engine.execute_agent("treasurer").await?;
        println!("\nCycle {}:", cycle);
        println!("  Action: {}", result.action);
        println!("  Params: {}", serde_json::to_string(&result.params)?);
        println!("  Confidence: {:.2}", result.confidence);
        println!("  Executed: {}", result.executed);
        if let Some(tx) = &result.tx_handle {
            println!("  Transaction: {}", tx);
        }
        if let Some(error) = &result.error {
            println!("  Error: {}", error);
        }
    }

    let memory = engine.memory("treasurer").await?;
    println!("\nMemory after 3 cycles:");
    println!("  Observations: {}", memory.observations.len());
    println!("  Actions: {}", memory.actions.len());
    for learning in &memory.learnings {
        println!("  Learning: {}", learning);
    }
    println!("  Client writes: {}", client.write_count());

    Ok(())
}

fn tracing_subscriber_init() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("agent_orchestrator_agent=debug")
        .try_init();
}
