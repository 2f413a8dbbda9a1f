//! Cross-module properties of the decision and execution engines

use std::sync::Arc;

use agent_orchestrator_agent::prelude::*;
use agent_orchestrator_core::config::EngineSettings;
use agent_orchestrator_core::testing::RecordingClient;
use agent_orchestrator_core::{
    ActionParams, AgentConfig, AgentMemory, Decision, MemoryLimits, ObservedState,
    OrchestratorConfig, Result,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use serde_json::json;

/// Always sends a small native transfer with high confidence
struct SteadyTransfer;

#[async_trait]
impl DecisionProvider for SteadyTransfer {
    fn name(&self) -> &str {
        "steady"
    }

    async fn generate_decision(&self, _ctx: &EvaluationContext<'_>) -> Result<Decision> {
        let mut params = ActionParams::new();
        params.insert("to".to_string(), json!("0xbob"));
        params.insert("amount".to_string(), json!(0.01));
        Ok(Decision {
            action: ActionKind::Transfer,
            params,
            reasoning: "steady drip".to_string(),
            confidence: 0.95,
            triggered_by: Vec::new(),
            rule_id: None,
        })
    }

    async fn explain_action(
        &self,
        decision: &Decision,
        _ctx: &EvaluationContext<'_>,
    ) -> Result<String> {
        Ok(decision.reasoning.clone())
    }
}

async fn run_cycles(limits: MemoryLimits, cycles: usize) -> AgentMemory {
    let config = OrchestratorConfig::builder().with_memory_limits(limits).build();
    let client = Arc::new(RecordingClient::new("0xagent", 1_000.0));
    let engine = AgentExecutionEngine::new(client, &config)
        .unwrap()
        .with_provider(Arc::new(SteadyTransfer));
    engine
        .register_agent("drip", AgentConfig::new("drip funds"))
        .await
        .unwrap();

    for _ in 0..cycles {
        engine.execute_agent("drip").await.unwrap();
    }
    engine.memory("drip").await.unwrap()
}

#[tokio::test]
async fn memory_stays_within_default_caps() {
    let memory = run_cycles(MemoryLimits::default(), 120).await;
    assert_eq!(memory.observations.len(), 100);
    assert_eq!(memory.actions.len(), 100);
    assert_eq!(memory.learnings.len(), 50);
}

fn threshold_trigger(id: usize, value: f64) -> Trigger {
    Trigger::new(
        format!("t{}", id),
        format!("balance below {}", value),
        TriggerConfig::Threshold {
            metric: Metric::Balance,
            operator: Comparison::Lt,
            value,
            token: None,
        },
    )
}

fn engine_from(thresholds: &[f64], bindings: &[(usize, f64, i32)]) -> DecisionEngine {
    let engine = DecisionEngine::new(EngineSettings::default());
    for (i, value) in thresholds.iter().enumerate() {
        engine.add_trigger(threshold_trigger(i, *value)).unwrap();
    }
    for (i, (trigger, condition, priority)) in bindings.iter().enumerate() {
        let rule = DecisionRule::new(
            format!("r{}", i),
            format!("rule {}", i),
            format!("t{}", trigger % thresholds.len()),
            ActionTemplate::new(ActionKind::Notify).with_param("message", json!("hello")),
        )
        .with_condition(DecisionCondition::new("native_balance", Comparison::Gt, *condition))
        .with_priority(*priority);
        engine.add_rule(rule).unwrap();
    }
    engine
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_memory_caps_hold(
        max_observations in 1usize..8,
        max_actions in 1usize..8,
        max_learnings in 1usize..8,
        cycles in 0usize..24,
    ) {
        let limits = MemoryLimits { max_observations, max_actions, max_learnings };
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let memory = runtime.block_on(run_cycles(limits, cycles));

        prop_assert!(memory.observations.len() <= max_observations);
        prop_assert!(memory.actions.len() <= max_actions);
        prop_assert!(memory.learnings.len() <= max_learnings);
        prop_assert_eq!(memory.observations.len(), cycles.min(max_observations));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_selected_rule_belongs_to_fired_trigger(
        thresholds in prop::collection::vec(0.0f64..2_000.0, 1..6),
        bindings in prop::collection::vec((0usize..6, 0.0f64..200.0, -3i32..3), 0..10),
        balance in 0.0f64..2_000.0,
        native in 0.0f64..200.0,
    ) {
        let engine = engine_from(&thresholds, &bindings);
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 12, 0, 0).unwrap();
        let mut state = ObservedState::new("0xagent", now);
        state.native_balance = native;
        state.token_balances.insert("cUSD".to_string(), balance);
        let memory = AgentMemory::new("agent", now, MemoryLimits::default());
        let config = AgentConfig::default();
        let ctx = EvaluationContext {
            agent_id: "agent",
            state: &state,
            memory: &memory,
            config: &config,
            settings: engine.settings(),
        };

        let fired: Vec<String> = engine.evaluate_triggers(&ctx).into_iter().map(|t| t.id).collect();
        let again: Vec<String> = engine.evaluate_triggers(&ctx).into_iter().map(|t| t.id).collect();
        prop_assert_eq!(&fired, &again);

        let decision = engine.generate_decision(&ctx);
        prop_assert_eq!(&decision.triggered_by, &fired);
        prop_assert!((0.0..=1.0).contains(&decision.confidence));
        if let Some(rule_id) = &decision.rule_id {
            let catalog = engine.snapshot();
            let rule = catalog.rule(rule_id).unwrap();
            prop_assert!(fired.contains(&rule.trigger_id));
        } else {
            prop_assert_eq!(decision.action, ActionKind::None);
        }
    }
}
