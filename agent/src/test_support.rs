//! Shared fixtures for unit tests

use agent_orchestrator_core::config::EngineSettings;
use agent_orchestrator_core::{
    ActionKind, ActionParams, AgentConfig, AgentMemory, Decision, MemoryLimits, ObservedState,
    Result,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use crate::context::EvaluationContext;
use crate::provider::DecisionProvider;
use crate::trigger::{Comparison, Metric, Trigger, TriggerConfig};

/// Owned pieces of an evaluation context
pub struct ContextParts {
    pub state: ObservedState,
    pub memory: AgentMemory,
    pub config: AgentConfig,
    pub settings: EngineSettings,
}

/// Empty state for `0xagent` at a fixed time, fresh memory and default config
pub fn context_parts() -> ContextParts {
    let now = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
    ContextParts {
        state: ObservedState::new("0xagent", now),
        memory: AgentMemory::new("agent-1", now, MemoryLimits::default()),
        config: AgentConfig::default(),
        settings: EngineSettings::default(),
    }
}

/// Threshold trigger on the default balance dropping below `value`
pub fn low_balance_trigger(id: &str, value: f64) -> Trigger {
    Trigger::new(
        id,
        "low balance",
        TriggerConfig::Threshold {
            metric: Metric::Balance,
            operator: Comparison::Lt,
            value,
            token: None,
        },
    )
}

/// Provider that always returns the same decision
pub struct FixedProvider {
    decision: Decision,
}

impl FixedProvider {
    pub fn new(action: ActionKind, params: ActionParams, confidence: f64) -> Self {
        Self {
            decision: Decision {
                action,
                params,
                reasoning: "fixed".to_string(),
                confidence,
                triggered_by: Vec::new(),
                rule_id: None,
            },
        }
    }
}

#[async_trait]
impl DecisionProvider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn generate_decision(&self, _ctx: &EvaluationContext<'_>) -> Result<Decision> {
        Ok(self.decision.clone())
    }

    async fn explain_action(
        &self,
        decision: &Decision,
        _ctx: &EvaluationContext<'_>,
    ) -> Result<String> {
        Ok(decision.reasoning.clone())
    }
}
