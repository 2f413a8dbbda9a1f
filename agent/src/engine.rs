//! Agent execution engine
//!
//! Owns the agent registry and runs decision cycles. One cycle observes the
//! agent's on-chain state, asks the decision provider for a decision, validates
//! it, dispatches it through the action table and records the outcome in the
//! agent's memory.
//!
//! Cycles for different agents run in parallel. Cycles for the same agent are
//! serialized by a per-agent lock held for the whole cycle.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use agent_orchestrator_core::config::EngineSettings;
use agent_orchestrator_core::{
    ActionKind, ActionRecord, AgentConfig, AgentConfigUpdate, AgentId, AgentMemory,
    BlockchainClient, Decision, Error, ExecutionMode, ExecutionResult, MemoryLimits,
    NetworkConfig, Observation, ObservedState, OrchestratorConfig, Result,
};
use agent_orchestrator_dapp::{ActionDispatcher, DispatchContext, DispatchOutcome};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};

use crate::catalog::Catalog;
use crate::context::EvaluationContext;
use crate::decision::DecisionEngine;
#[cfg(feature = "metrics")]
use crate::metrics::{CycleOutcome, EngineMetrics};
use crate::model::ScoringModel;
use crate::phase::{CycleEvent, CyclePhase};
use crate::provider::{DecisionProvider, RuleBasedProvider};
use crate::rule::DecisionRule;
use crate::store::MemoryStore;
use crate::trigger::Trigger;
use crate::validation;

/// Result string recorded for proposed actions
pub const PROPOSED_RESULT: &str = "proposed";
/// Result string recorded for actions that completed off-chain
pub const OFF_CHAIN_RESULT: &str = "off-chain";
/// Action name recorded for failed cycles
pub const ERROR_ACTION: &str = "error";

struct AgentSlot {
    config: AgentConfig,
    memory: AgentMemory,
}

struct AgentEntry {
    slot: Mutex<AgentSlot>,
    phase: StdMutex<CyclePhase>,
    removed: AtomicBool,
}

impl AgentEntry {
    fn new(config: AgentConfig, memory: AgentMemory) -> Self {
        Self {
            slot: Mutex::new(AgentSlot { config, memory }),
            phase: StdMutex::new(CyclePhase::Idle),
            removed: AtomicBool::new(false),
        }
    }

    fn phase(&self) -> CyclePhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn advance(&self, event: CycleEvent) {
        let mut phase = self.phase.lock().unwrap_or_else(PoisonError::into_inner);
        match phase.transition(event) {
            Ok(next) => *phase = next,
            Err(e) => {
                warn!(error = %e, "Resetting cycle phase");
                *phase = CyclePhase::Idle;
            }
        }
    }
}

/// State read at the start of a cycle
struct Observed {
    state: ObservedState,
    network: NetworkConfig,
}

/// How far a decided action got
enum Verdict {
    /// The decision was `none`
    Idle,
    /// Validated but not dispatched
    Proposed,
    /// Rejected by validation
    Rejected(String),
    /// Dispatched successfully
    Executed(DispatchOutcome),
    /// Decision or dispatch failed
    Failed(Error),
}

impl Verdict {
    #[cfg(feature = "metrics")]
    fn outcome(&self) -> CycleOutcome {
        match self {
            Verdict::Idle => CycleOutcome::Skipped,
            Verdict::Proposed => CycleOutcome::Proposed,
            Verdict::Rejected(_) => CycleOutcome::Rejected,
            Verdict::Executed(_) => CycleOutcome::Executed,
            Verdict::Failed(_) => CycleOutcome::Failed,
        }
    }
}

/// Runs decision cycles for a registry of agents
pub struct AgentExecutionEngine {
    client: Arc<dyn BlockchainClient>,
    decisions: Arc<DecisionEngine>,
    provider: Arc<dyn DecisionProvider>,
    dispatcher: ActionDispatcher,
    settings: EngineSettings,
    limits: MemoryLimits,
    client_timeout: Option<Duration>,
    store: Option<MemoryStore>,
    agents: RwLock<HashMap<AgentId, Arc<AgentEntry>>>,
    #[cfg(feature = "metrics")]
    metrics: Option<EngineMetrics>,
}

impl fmt::Debug for AgentExecutionEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentExecutionEngine")
            .field("provider", &self.provider.name())
            .field("settings", &self.settings)
            .field("limits", &self.limits)
            .field("client_timeout", &self.client_timeout)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl AgentExecutionEngine {
    /// Engine with an empty catalog and the rule-based provider
    pub fn new(client: Arc<dyn BlockchainClient>, config: &OrchestratorConfig) -> Result<Self> {
        let settings = config.engine.clone();
        let decisions = Arc::new(DecisionEngine::new(settings.clone()));
        let store = if config.memory.persist {
            Some(MemoryStore::new(&config.memory.snapshot_dir)?)
        } else {
            None
        };

        #[cfg(feature = "metrics")]
        let metrics = if config.monitoring.metrics.enabled {
            Some(EngineMetrics::new()?)
        } else {
            None
        };

        Ok(Self {
            client,
            provider: Arc::new(RuleBasedProvider::new(Arc::clone(&decisions))),
            decisions,
            dispatcher: ActionDispatcher::new(),
            settings,
            limits: config.memory_limits(),
            client_timeout: config.client_timeout(),
            store,
            agents: RwLock::new(HashMap::new()),
            #[cfg(feature = "metrics")]
            metrics,
        })
    }

    /// Start from an existing catalog; resets the provider to the rule-based one
    pub fn with_catalog(mut self, catalog: Catalog) -> Self {
        self.decisions = Arc::new(DecisionEngine::with_catalog(self.settings.clone(), catalog));
        self.provider = Arc::new(RuleBasedProvider::new(Arc::clone(&self.decisions)));
        self
    }

    /// Use another decision provider instead of the rule-based engine
    pub fn with_provider(mut self, provider: Arc<dyn DecisionProvider>) -> Self {
        self.provider = provider;
        self
    }

    /// Record cycle counters into `metrics`
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: EngineMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Cycle counters, when enabled
    #[cfg(feature = "metrics")]
    pub fn metrics(&self) -> Option<&EngineMetrics> {
        self.metrics.as_ref()
    }

    /// The rule-based decision engine backing the catalog
    pub fn decision_engine(&self) -> &Arc<DecisionEngine> {
        &self.decisions
    }

    /// Active decision provider
    pub fn provider(&self) -> &Arc<dyn DecisionProvider> {
        &self.provider
    }

    /// Engine tuning
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Snapshot store, when persistence is enabled
    pub fn store(&self) -> Option<&MemoryStore> {
        self.store.as_ref()
    }

    /// Add a trigger to the shared catalog
    pub fn add_trigger(&self, trigger: Trigger) -> Result<String> {
        self.decisions.add_trigger(trigger)
    }

    /// Add a rule to the shared catalog
    pub fn add_rule(&self, rule: DecisionRule) -> Result<String> {
        self.decisions.add_rule(rule)
    }

    /// Add a scoring model to the shared catalog
    pub fn add_model(&self, model: ScoringModel) -> Result<String> {
        self.decisions.add_model(model)
    }

    /// Register an agent with fresh memory
    #[instrument(skip(self, config))]
    pub async fn register_agent(&self, agent_id: &str, config: AgentConfig) -> Result<()> {
        let mut agents = self.agents.write().await;
        if agents.contains_key(agent_id) {
            return Err(Error::AgentAlreadyRegistered(agent_id.to_string()));
        }

        let memory = AgentMemory::new(agent_id, Utc::now(), self.limits);
        agents.insert(agent_id.to_string(), Arc::new(AgentEntry::new(config, memory)));
        info!("Agent registered");
        Ok(())
    }

    /// Merge a partial update into the agent's configuration
    #[instrument(skip(self, update))]
    pub async fn update_agent_config(
        &self,
        agent_id: &str,
        update: AgentConfigUpdate,
    ) -> Result<AgentConfig> {
        let entry = self.entry(agent_id).await?;
        let mut slot = entry.slot.lock().await;
        update.apply_to(&mut slot.config);
        info!("Agent configuration updated");
        Ok(slot.config.clone())
    }

    /// Remove the agent, its memory and its snapshot; waits for an in-flight cycle
    #[instrument(skip(self))]
    pub async fn deregister_agent(&self, agent_id: &str) -> Result<AgentMemory> {
        let entry = self
            .agents
            .write()
            .await
            .remove(agent_id)
            .ok_or_else(|| Error::AgentNotRegistered(agent_id.to_string()))?;

        let slot = entry.slot.lock().await;
        entry.removed.store(true, Ordering::SeqCst);
        if let Some(store) = &self.store {
            store.remove(agent_id)?;
        }
        info!("Agent deregistered");
        Ok(slot.memory.clone())
    }

    /// Replace the agent's memory with its snapshot; `false` when none exists
    #[instrument(skip(self))]
    pub async fn restore_memory(&self, agent_id: &str) -> Result<bool> {
        let Some(store) = &self.store else {
            return Ok(false);
        };
        let entry = self.entry(agent_id).await?;
        let mut slot = entry.slot.lock().await;
        match store.load(agent_id, self.limits)? {
            Some(memory) => {
                slot.memory = memory;
                info!("Agent memory restored");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Registered agent ids, sorted
    pub async fn agent_ids(&self) -> Vec<AgentId> {
        let mut ids: Vec<AgentId> = self.agents.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Copy of the agent's configuration
    pub async fn agent_config(&self, agent_id: &str) -> Result<AgentConfig> {
        let entry = self.entry(agent_id).await?;
        let slot = entry.slot.lock().await;
        Ok(slot.config.clone())
    }

    /// Copy of the agent's memory
    pub async fn memory(&self, agent_id: &str) -> Result<AgentMemory> {
        let entry = self.entry(agent_id).await?;
        let slot = entry.slot.lock().await;
        Ok(slot.memory.clone())
    }

    /// Current cycle phase of the agent
    pub async fn phase(&self, agent_id: &str) -> Result<CyclePhase> {
        Ok(self.entry(agent_id).await?.phase())
    }

    async fn entry(&self, agent_id: &str) -> Result<Arc<AgentEntry>> {
        self.agents
            .read()
            .await
            .get(agent_id)
            .cloned()
            .ok_or_else(|| Error::AgentNotRegistered(agent_id.to_string()))
    }

    /// Run one decision cycle for the agent
    ///
    /// Only an unregistered agent is an error; every failure inside the cycle
    /// is recorded in memory and reported through the returned result.
    #[instrument(skip(self))]
    pub async fn execute_agent(&self, agent_id: &str) -> Result<ExecutionResult> {
        let entry = self.entry(agent_id).await?;
        let mut slot = entry.slot.lock().await;
        if entry.removed.load(Ordering::SeqCst) {
            return Err(Error::AgentNotRegistered(agent_id.to_string()));
        }

        let result = self.run_cycle(agent_id, &entry, &mut slot).await;

        if let Some(store) = &self.store {
            if let Err(e) = store.save(&slot.memory) {
                warn!(error = %e, "Failed to save memory snapshot");
            }
        }
        Ok(result)
    }

    /// Run one cycle for every registered agent, results sorted by agent id
    pub async fn execute_all(&self) -> Vec<ExecutionResult> {
        let ids = self.agent_ids().await;
        let limit = self.settings.max_concurrent_agents.max(1);

        let mut results: Vec<ExecutionResult> = stream::iter(ids)
            .map(|agent_id| async move {
                let result = self.execute_agent(&agent_id).await;
                result.unwrap_or_else(|e| ExecutionResult::failed(agent_id, e.to_string()))
            })
            .buffer_unordered(limit)
            .collect()
            .await;

        results.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        results
    }

    async fn run_cycle(
        &self,
        agent_id: &str,
        entry: &AgentEntry,
        slot: &mut AgentSlot,
    ) -> ExecutionResult {
        entry.advance(CycleEvent::Start);

        let observed = match self.observe_state(&slot.config).await {
            Ok(observed) => observed,
            Err(e) => {
                error!(error = %e, "Observation failed");
                entry.advance(CycleEvent::Failed);
                let now = Utc::now();
                slot.memory.push_action(error_record(now, &Default::default(), &e));
                slot.memory.last_run = now;
                entry.advance(CycleEvent::Recorded);
                #[cfg(feature = "metrics")]
                self.count_cycle(CycleOutcome::Failed, ActionKind::None, &[]);
                return ExecutionResult::failed(agent_id, e.to_string());
            }
        };
        entry.advance(CycleEvent::Observed);

        let (decision, verdict) = {
            let ctx = EvaluationContext {
                agent_id,
                state: &observed.state,
                memory: &slot.memory,
                config: &slot.config,
                settings: &self.settings,
            };
            self.decide_and_act(&ctx, &observed.network, entry).await
        };

        if matches!(entry.phase(), CyclePhase::Skipped | CyclePhase::Rejected) {
            entry.advance(CycleEvent::Record);
        }
        self.update_memory(&mut slot.memory, &observed.state, decision.as_ref(), &verdict);
        entry.advance(CycleEvent::Recorded);

        #[cfg(feature = "metrics")]
        self.count_cycle(
            verdict.outcome(),
            decision.as_ref().map_or(ActionKind::None, |d| d.action),
            decision.as_ref().map_or(&[][..], |d| &d.triggered_by[..]),
        );

        cycle_result(agent_id, decision, verdict)
    }

    async fn decide_and_act(
        &self,
        ctx: &EvaluationContext<'_>,
        network: &NetworkConfig,
        entry: &AgentEntry,
    ) -> (Option<Decision>, Verdict) {
        let decision = match self.provider.generate_decision(ctx).await {
            Ok(decision) => decision,
            Err(e) => {
                error!(provider = self.provider.name(), error = %e, "Decision failed");
                entry.advance(CycleEvent::Failed);
                return (None, Verdict::Failed(e));
            }
        };
        entry.advance(CycleEvent::Decided);
        debug!(
            action = %decision.action,
            confidence = decision.confidence,
            triggers = ?decision.triggered_by,
            "Decision made"
        );

        if decision.action == ActionKind::None {
            entry.advance(CycleEvent::Skip);
            return (Some(decision), Verdict::Idle);
        }

        if let Err(e) = self.validate_action(&decision, ctx).await {
            let reason = match e {
                Error::ValidationFailed(reason) => reason,
                other => other.to_string(),
            };
            warn!(action = %decision.action, reason = %reason, "Action rejected");
            entry.advance(CycleEvent::Reject);
            return (Some(decision), Verdict::Rejected(reason));
        }

        if ctx.config.execution_mode == ExecutionMode::Propose {
            info!(action = %decision.action, "Action proposed");
            entry.advance(CycleEvent::Skip);
            return (Some(decision), Verdict::Proposed);
        }

        entry.advance(CycleEvent::Approved);
        let dispatch_ctx = DispatchContext {
            agent_id: ctx.agent_id,
            address: &ctx.state.address,
            network,
        };
        let dispatched = self
            .call(
                "dispatch",
                self.dispatcher.dispatch(
                    decision.action,
                    &decision.params,
                    dispatch_ctx,
                    self.client.as_ref(),
                ),
            )
            .await;

        match dispatched {
            Ok(outcome) => {
                entry.advance(CycleEvent::Dispatched);
                info!(
                    action = %decision.action,
                    tx = ?outcome.tx_handle().map(|h| h.as_str()),
                    "Action executed"
                );
                (Some(decision), Verdict::Executed(outcome))
            }
            Err(e) => {
                error!(action = %decision.action, error = %e, "Dispatch failed");
                entry.advance(CycleEvent::Failed);
                (Some(decision), Verdict::Failed(e))
            }
        }
    }

    /// Local checks followed by the provider's own checks
    pub async fn validate_action(&self, decision: &Decision, ctx: &EvaluationContext<'_>) -> Result<()> {
        validation::validate_action(decision.action, &decision.params, ctx)?;
        self.provider.validate_action(decision, ctx).await
    }

    /// Read the agent's wallet and contract state
    async fn observe_state(&self, config: &AgentConfig) -> Result<Observed> {
        let address = match &config.address {
            Some(address) => address.clone(),
            None => self
                .call("get_addresses", self.client.get_addresses())
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| Error::client("client controls no addresses"))?,
        };
        let network = self
            .call("get_network_config", self.client.get_network_config())
            .await?;

        let mut state = ObservedState::new(address.clone(), Utc::now());
        state.native_balance = self
            .call("get_native_balance", self.client.get_native_balance(&address))
            .await?;
        for (symbol, token) in &network.tokens {
            let balance = self
                .call(
                    "get_token_balance",
                    self.client.get_token_balance(&token.address, &address),
                )
                .await?;
            state.token_balances.insert(symbol.clone(), balance);
        }

        state.recent_transactions = self
            .call(
                "get_transaction_history",
                self.client
                    .get_transaction_history(&address, self.settings.transaction_history_limit),
            )
            .await?;
        state.events = state
            .recent_transactions
            .iter()
            .flat_map(|tx| tx.events.iter().cloned())
            .collect();

        if let Some(oracle) = network.contract("oracle") {
            match self
                .call(
                    "read_contract",
                    self.client.read_contract(oracle, "getMetrics", &[json!(address)]),
                )
                .await
            {
                Ok(metrics) => merge_metrics(&mut state, &metrics),
                Err(e) => warn!(error = %e, "Failed to read market metrics"),
            }
        }

        if let Some(registry) = network.contract("agentRegistry") {
            match self
                .call(
                    "read_contract",
                    self.client.read_contract(registry, "getAgentInfo", &[json!(address)]),
                )
                .await
            {
                Ok(info) => apply_agent_info(&mut state, &info),
                Err(e) => warn!(error = %e, "Failed to read agent metadata"),
            }
        }

        debug!(
            address = %state.address,
            native_balance = state.native_balance,
            tokens = state.token_balances.len(),
            events = state.events.len(),
            "State observed"
        );
        Ok(Observed { state, network })
    }

    fn update_memory(
        &self,
        memory: &mut AgentMemory,
        state: &ObservedState,
        decision: Option<&Decision>,
        verdict: &Verdict,
    ) {
        let now = state.timestamp;
        memory.push_observation(Observation::from_state(state));

        match (decision, verdict) {
            (_, Verdict::Idle) => {}
            (None, Verdict::Failed(e)) => memory.push_action(error_record(now, &Default::default(), e)),
            (Some(decision), Verdict::Failed(e)) => {
                memory.push_action(error_record(now, &decision.params, e))
            }
            (Some(decision), Verdict::Proposed) => {
                memory.push_action(action_record(now, decision, PROPOSED_RESULT, true))
            }
            (Some(decision), Verdict::Rejected(reason)) => {
                memory.push_action(action_record(now, decision, reason, false))
            }
            (Some(decision), Verdict::Executed(outcome)) => {
                let result = outcome.tx_handle().map_or(OFF_CHAIN_RESULT, |h| h.as_str());
                memory.push_action(action_record(now, decision, result, true));

                if decision.action.is_transfer_like() {
                    if let Some(amount) = decision.params.get("amount").and_then(Value::as_f64) {
                        memory.record_spend(now.date_naive(), amount);
                    }
                }

                if outcome.tx_handle().is_some()
                    && decision.confidence > self.settings.learning_confidence_threshold
                {
                    memory.push_learning(format!(
                        "{} succeeded with confidence {:.2}: {}",
                        decision.action, decision.confidence, decision.reasoning
                    ));
                }
            }
            (None, _) => {}
        }

        if let Some(decision) = decision {
            for trigger_id in &decision.triggered_by {
                memory.trigger_runs.insert(trigger_id.clone(), now);
            }
            if let Some(rule_id) = &decision.rule_id {
                memory.rule_runs.insert(rule_id.clone(), now);
            }
        }
        memory.last_run = now;
    }

    async fn call<T>(&self, operation: &str, call: impl Future<Output = Result<T>>) -> Result<T> {
        match self.client_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                Error::Timeout(format!("{} did not complete within {:?}", operation, limit))
            })?,
            None => call.await,
        }
    }

    #[cfg(feature = "metrics")]
    fn count_cycle(&self, outcome: CycleOutcome, action: ActionKind, fired: &[String]) {
        if let Some(metrics) = &self.metrics {
            metrics.record_cycle(outcome, action.as_str(), fired);
        }
    }
}

fn action_record(
    timestamp: DateTime<Utc>,
    decision: &Decision,
    result: &str,
    success: bool,
) -> ActionRecord {
    ActionRecord {
        timestamp,
        action: decision.action.as_str().to_string(),
        params: decision.params.clone(),
        result: result.to_string(),
        success,
    }
}

fn error_record(
    timestamp: DateTime<Utc>,
    params: &agent_orchestrator_core::ActionParams,
    error: &Error,
) -> ActionRecord {
    ActionRecord {
        timestamp,
        action: ERROR_ACTION.to_string(),
        params: params.clone(),
        result: error.to_string(),
        success: false,
    }
}

fn cycle_result(agent_id: &str, decision: Option<Decision>, verdict: Verdict) -> ExecutionResult {
    let Some(decision) = decision else {
        let error = match verdict {
            Verdict::Failed(e) => e.to_string(),
            _ => "no decision".to_string(),
        };
        return ExecutionResult::failed(agent_id, error);
    };

    let mut result = ExecutionResult {
        agent_id: agent_id.to_string(),
        action: decision.action,
        params: decision.params,
        reasoning: decision.reasoning,
        confidence: decision.confidence,
        executed: false,
        proposed: false,
        tx_handle: None,
        error: None,
    };
    match verdict {
        Verdict::Idle => {}
        Verdict::Proposed => result.proposed = true,
        Verdict::Rejected(reason) => result.error = Some(reason),
        Verdict::Executed(outcome) => {
            result.executed = true;
            result.tx_handle = outcome.tx_handle().cloned();
        }
        Verdict::Failed(e) => result.error = Some(e.to_string()),
    }
    result
}

/// Merge numeric fields of an oracle response into the state's metrics
fn merge_metrics(state: &mut ObservedState, metrics: &Value) {
    let Some(fields) = metrics.as_object() else {
        return;
    };
    for (name, value) in fields {
        if let Some(number) = value.as_f64() {
            state.metrics.insert(name.clone(), number);
        }
    }
}

/// Apply the registry's `dailySpent`, `active` and `permissions` fields
fn apply_agent_info(state: &mut ObservedState, info: &Value) {
    if let Some(spent) = info.get("dailySpent").and_then(Value::as_f64) {
        state.daily_spent = Some(spent);
    }
    if let Some(active) = info.get("active").and_then(Value::as_bool) {
        state.active = active;
    }
    if let Some(permissions) = info.get("permissions").and_then(Value::as_array) {
        state.permissions = permissions
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }
}
