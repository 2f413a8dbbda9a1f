//! Pluggable decision sources
//!
//! The execution engine asks a [`DecisionProvider`] for each decision. The
//! built-in [`RuleBasedProvider`] delegates to the [`DecisionEngine`]; an
//! external provider (for example one backed by a language model) can replace
//! it without touching the execution engine.

use std::sync::Arc;

use agent_orchestrator_core::{ActionKind, Decision, Result};
use async_trait::async_trait;

use crate::context::EvaluationContext;
use crate::decision::DecisionEngine;

/// Source of decisions for the execution engine
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Decide what the agent should do; the context carries the agent type,
    /// goal and constraints along with the observed state and memory
    async fn generate_decision(&self, ctx: &EvaluationContext<'_>) -> Result<Decision>;

    /// Human-readable explanation of a decision
    async fn explain_action(&self, decision: &Decision, ctx: &EvaluationContext<'_>)
        -> Result<String>;

    /// Provider-specific checks run after local validation
    async fn validate_action(
        &self,
        _decision: &Decision,
        _ctx: &EvaluationContext<'_>,
    ) -> Result<()> {
        Ok(())
    }
}

/// Provider backed by the rule-based decision engine
#[derive(Debug, Clone)]
pub struct RuleBasedProvider {
    engine: Arc<DecisionEngine>,
}

impl RuleBasedProvider {
    /// Wrap a decision engine
    pub fn new(engine: Arc<DecisionEngine>) -> Self {
        Self { engine }
    }

    /// The wrapped engine
    pub fn engine(&self) -> &Arc<DecisionEngine> {
        &self.engine
    }
}

#[async_trait]
impl DecisionProvider for RuleBasedProvider {
    fn name(&self) -> &str {
        "rule-based"
    }

    async fn generate_decision(&self, ctx: &EvaluationContext<'_>) -> Result<Decision> {
        Ok(self.engine.generate_decision(ctx))
    }

    async fn explain_action(
        &self,
        decision: &Decision,
        _ctx: &EvaluationContext<'_>,
    ) -> Result<String> {
        let triggers = if decision.triggered_by.is_empty() {
            "none".to_string()
        } else {
            decision.triggered_by.join(", ")
        };

        if decision.action == ActionKind::None {
            return Ok(format!(
                "No action taken ({}). Triggers fired: {}.",
                decision.reasoning, triggers
            ));
        }

        let catalog = self.engine.snapshot();
        let rule = decision
            .rule_id
            .as_deref()
            .and_then(|id| catalog.rule(id))
            .map(|rule| format!("rule '{}' on trigger '{}'", rule.name, rule.trigger_id))
            .unwrap_or_else(|| "an unlisted rule".to_string());

        Ok(format!(
            "Chose {} via {} with confidence {:.2}. Triggers fired: {}. {}",
            decision.action, rule, decision.confidence, triggers, decision.reasoning
        ))
    }
}
