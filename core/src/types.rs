//! Core data types for the agent orchestrator
//!
//! This module defines the data model shared by the decision engine, the
//! execution engine and the action handlers: action kinds and parameters,
//! agent configuration, bounded agent memory, the observed on-chain state and
//! the decision/execution results.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::{ChainEvent, TransactionSummary, TxHandle};
use crate::error::Error;

/// Agent identifier
pub type AgentId = String;

/// Resolved or templated action parameters, keyed by parameter name
pub type ActionParams = BTreeMap<String, Value>;

/// Every action an agent can decide on
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// No operation
    None,
    /// Native or token transfer
    Transfer,
    /// Token swap through a DEX router
    Swap,
    /// Protocol deposit
    Stake,
    /// Protocol withdrawal
    Unstake,
    /// Reward claim
    Claim,
    /// Buy order
    Buy,
    /// Sell order
    Sell,
    /// Payment request
    Request,
    /// NFT mint
    Mint,
    /// Off-chain notification
    Notify,
}

impl ActionKind {
    /// All action kinds
    pub const ALL: [ActionKind; 11] = [
        ActionKind::None,
        ActionKind::Transfer,
        ActionKind::Swap,
        ActionKind::Stake,
        ActionKind::Unstake,
        ActionKind::Claim,
        ActionKind::Buy,
        ActionKind::Sell,
        ActionKind::Request,
        ActionKind::Mint,
        ActionKind::Notify,
    ];

    /// Wire name of the action
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::None => "none",
            ActionKind::Transfer => "transfer",
            ActionKind::Swap => "swap",
            ActionKind::Stake => "stake",
            ActionKind::Unstake => "unstake",
            ActionKind::Claim => "claim",
            ActionKind::Buy => "buy",
            ActionKind::Sell => "sell",
            ActionKind::Request => "request",
            ActionKind::Mint => "mint",
            ActionKind::Notify => "notify",
        }
    }

    /// Whether the action spends from the agent's available balance
    pub fn is_transfer_like(&self) -> bool {
        matches!(
            self,
            ActionKind::Transfer
                | ActionKind::Swap
                | ActionKind::Stake
                | ActionKind::Buy
                | ActionKind::Sell
        )
    }

    /// Parameters that must be present before the action may be dispatched
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            ActionKind::None => &[],
            ActionKind::Transfer => &["to", "amount"],
            ActionKind::Swap => &["from_token", "to_token", "amount"],
            ActionKind::Stake => &["amount"],
            ActionKind::Unstake => &["amount"],
            ActionKind::Claim => &[],
            ActionKind::Buy => &["token", "amount"],
            ActionKind::Sell => &["token", "amount"],
            ActionKind::Request => &["from", "amount"],
            ActionKind::Mint => &["to"],
            ActionKind::Notify => &["message"],
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ActionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::UnknownAction(s.to_string()))
    }
}

/// Whether validated actions are dispatched or only proposed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Dispatch validated actions
    #[default]
    Auto,
    /// Return validated actions without dispatching them
    Propose,
}

/// Spending limits enforced locally before dispatch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SpendingLimits {
    /// Maximum total spend per UTC day
    pub daily: f64,
    /// Maximum amount of a single action
    pub per_tx: f64,
}

impl Default for SpendingLimits {
    fn default() -> Self {
        Self {
            daily: 10.0,
            per_tx: 1.0,
        }
    }
}

/// Per-agent configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentConfig {
    /// Agent category, forwarded to external decision providers
    pub agent_type: String,
    /// Free-form goal
    pub goal: String,
    /// Free-form constraints
    pub constraints: Vec<String>,
    /// Execution mode
    pub execution_mode: ExecutionMode,
    /// Spending limits
    pub spending_limits: SpendingLimits,
    /// Allowed counterparties (empty = any)
    pub whitelist: Vec<String>,
    /// Forbidden counterparties
    pub blacklist: Vec<String>,
    /// Allowed action kinds (empty = any)
    pub permissions: Vec<ActionKind>,
    /// On-chain address the agent acts for (defaults to the client's first address)
    pub address: Option<String>,
    /// Destination used when risk is high
    pub emergency_wallet: Option<String>,
    /// Token symbols considered when selecting a token
    pub preferred_tokens: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_type: "general".to_string(),
            goal: String::new(),
            constraints: Vec::new(),
            execution_mode: ExecutionMode::Auto,
            spending_limits: SpendingLimits::default(),
            whitelist: Vec::new(),
            blacklist: Vec::new(),
            permissions: Vec::new(),
            address: None,
            emergency_wallet: None,
            preferred_tokens: Vec::new(),
        }
    }
}

impl AgentConfig {
    /// Create a configuration with the given goal and defaults elsewhere
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            ..Self::default()
        }
    }

    /// Whether the agent may perform `kind`
    pub fn permits(&self, kind: ActionKind) -> bool {
        kind == ActionKind::None || self.permissions.is_empty() || self.permissions.contains(&kind)
    }

    /// Whether the counterparty passes the whitelist and blacklist
    pub fn allows_counterparty(&self, address: &str) -> bool {
        if self.blacklist.iter().any(|a| a.eq_ignore_ascii_case(address)) {
            return false;
        }
        self.whitelist.is_empty() || self.whitelist.iter().any(|a| a.eq_ignore_ascii_case(address))
    }
}

/// Partial update of an [`AgentConfig`]; only provided fields change
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfigUpdate {
    /// New agent type
    pub agent_type: Option<String>,
    /// New goal
    pub goal: Option<String>,
    /// New constraints
    pub constraints: Option<Vec<String>>,
    /// New execution mode
    pub execution_mode: Option<ExecutionMode>,
    /// New spending limits
    pub spending_limits: Option<SpendingLimits>,
    /// New whitelist
    pub whitelist: Option<Vec<String>>,
    /// New blacklist
    pub blacklist: Option<Vec<String>>,
    /// New permissions
    pub permissions: Option<Vec<ActionKind>>,
    /// New address
    pub address: Option<String>,
    /// New emergency wallet
    pub emergency_wallet: Option<String>,
    /// New preferred tokens
    pub preferred_tokens: Option<Vec<String>>,
}

impl AgentConfigUpdate {
    /// Merge the provided fields into `config`
    pub fn apply_to(self, config: &mut AgentConfig) {
        if let Some(agent_type) = self.agent_type {
            config.agent_type = agent_type;
        }
        if let Some(goal) = self.goal {
            config.goal = goal;
        }
        if let Some(constraints) = self.constraints {
            config.constraints = constraints;
        }
        if let Some(mode) = self.execution_mode {
            config.execution_mode = mode;
        }
        if let Some(limits) = self.spending_limits {
            config.spending_limits = limits;
        }
        if let Some(whitelist) = self.whitelist {
            config.whitelist = whitelist;
        }
        if let Some(blacklist) = self.blacklist {
            config.blacklist = blacklist;
        }
        if let Some(permissions) = self.permissions {
            config.permissions = permissions;
        }
        if let Some(address) = self.address {
            config.address = Some(address);
        }
        if let Some(wallet) = self.emergency_wallet {
            config.emergency_wallet = Some(wallet);
        }
        if let Some(tokens) = self.preferred_tokens {
            config.preferred_tokens = tokens;
        }
    }
}

/// Token symbol naming the chain's native asset
pub const NATIVE_TOKEN: &str = "native";

/// Whether `symbol` names the native asset, ignoring case
pub fn is_native_token(symbol: &str) -> bool {
    symbol.eq_ignore_ascii_case(NATIVE_TOKEN)
}

/// Snapshot of wallet and contract state taken at decision time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservedState {
    /// Address the state was read for
    pub address: String,
    /// Observation time
    pub timestamp: DateTime<Utc>,
    /// Native balance
    pub native_balance: f64,
    /// Token balances by symbol
    pub token_balances: BTreeMap<String, f64>,
    /// Market metrics (`price`, `volume`, `apy`, `gas_price`), optionally token scoped as `price:cUSD`
    pub metrics: BTreeMap<String, f64>,
    /// Recent transactions
    pub recent_transactions: Vec<TransactionSummary>,
    /// Contract events seen in the recent transactions
    pub events: Vec<ChainEvent>,
    /// Amount spent today according to on-chain metadata
    pub daily_spent: Option<f64>,
    /// Whether the agent is active on-chain
    pub active: bool,
    /// Permissions recorded on-chain
    pub permissions: Vec<String>,
}

impl ObservedState {
    /// Empty state for `address` at `timestamp`
    pub fn new(address: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            address: address.into(),
            timestamp,
            native_balance: 0.0,
            token_balances: BTreeMap::new(),
            metrics: BTreeMap::new(),
            recent_transactions: Vec::new(),
            events: Vec::new(),
            daily_spent: None,
            active: true,
            permissions: Vec::new(),
        }
    }

    /// Balance of `token`, or of the native asset when `token` is `None` or names it
    pub fn balance_of(&self, token: Option<&str>) -> Option<f64> {
        match token {
            Some(symbol) if !is_native_token(symbol) => self.token_balances.get(symbol).copied(),
            _ => Some(self.native_balance),
        }
    }

    /// Market metric, preferring the token-scoped entry when a token is given
    pub fn metric(&self, name: &str, token: Option<&str>) -> Option<f64> {
        if let Some(symbol) = token {
            if let Some(value) = self.metrics.get(&format!("{}:{}", name, symbol)) {
                return Some(*value);
            }
        }
        self.metrics.get(name).copied()
    }

    /// Names of all events in this snapshot
    pub fn event_names(&self) -> Vec<String> {
        self.events.iter().map(|e| e.name.clone()).collect()
    }
}

/// One recorded snapshot
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    /// Time of observation
    pub timestamp: DateTime<Utc>,
    /// Observation type
    #[serde(rename = "type")]
    pub kind: String,
    /// Snapshot payload
    pub data: Value,
    /// Names of events seen in the snapshot
    #[serde(default)]
    pub event_names: Vec<String>,
}

impl Observation {
    /// Build a wallet-state observation from an observed state
    pub fn from_state(state: &ObservedState) -> Self {
        Self {
            timestamp: state.timestamp,
            kind: "wallet_state".to_string(),
            data: serde_json::to_value(state).unwrap_or(Value::Null),
            event_names: state.event_names(),
        }
    }
}

/// One attempted action or error
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionRecord {
    /// Time of the attempt
    pub timestamp: DateTime<Utc>,
    /// Action name, or `error`
    #[serde(rename = "type")]
    pub action: String,
    /// Parameters used
    pub params: ActionParams,
    /// Transaction handle, rejection reason or error message
    pub result: String,
    /// Whether the attempt succeeded
    pub success: bool,
}

impl ActionRecord {
    /// Amount carried in the parameters, if any
    pub fn amount(&self) -> Option<f64> {
        self.params.get("amount").and_then(Value::as_f64)
    }
}

/// Caps applied to an agent's rolling memory
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryLimits {
    /// Maximum observations kept
    pub max_observations: usize,
    /// Maximum action records kept
    pub max_actions: usize,
    /// Maximum learnings kept
    pub max_learnings: usize,
}

impl Default for MemoryLimits {
    fn default() -> Self {
        Self {
            max_observations: 100,
            max_actions: 100,
            max_learnings: 50,
        }
    }
}

/// Locally tracked spend for one UTC day
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DailySpend {
    /// Day the total belongs to
    pub day: NaiveDate,
    /// Amount spent on that day
    pub total: f64,
}

/// Bounded rolling history of one agent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentMemory {
    /// Owning agent
    pub agent_id: AgentId,
    /// Recent observations, oldest first
    pub observations: VecDeque<Observation>,
    /// Recent action records, oldest first
    pub actions: VecDeque<ActionRecord>,
    /// Learnings, oldest first
    pub learnings: VecDeque<String>,
    /// Time of the last completed cycle
    pub last_run: DateTime<Utc>,
    /// Last time each trigger fired
    #[serde(default)]
    pub trigger_runs: BTreeMap<String, DateTime<Utc>>,
    /// Last time each rule was selected
    #[serde(default)]
    pub rule_runs: BTreeMap<String, DateTime<Utc>>,
    /// Spend tracked for the current day
    #[serde(default)]
    pub spend: Option<DailySpend>,
    /// Caps applied on every append
    #[serde(default)]
    pub limits: MemoryLimits,
}

impl AgentMemory {
    /// Fresh memory with empty histories
    pub fn new(agent_id: impl Into<AgentId>, now: DateTime<Utc>, limits: MemoryLimits) -> Self {
        Self {
            agent_id: agent_id.into(),
            observations: VecDeque::new(),
            actions: VecDeque::new(),
            learnings: VecDeque::new(),
            last_run: now,
            trigger_runs: BTreeMap::new(),
            rule_runs: BTreeMap::new(),
            spend: None,
            limits,
        }
    }

    /// Append an observation, evicting the oldest beyond the cap
    pub fn push_observation(&mut self, observation: Observation) {
        self.observations.push_back(observation);
        truncate_front(&mut self.observations, self.limits.max_observations);
    }

    /// Append an action record, evicting the oldest beyond the cap
    pub fn push_action(&mut self, record: ActionRecord) {
        self.actions.push_back(record);
        truncate_front(&mut self.actions, self.limits.max_actions);
    }

    /// Append a learning, evicting the oldest beyond the cap
    pub fn push_learning(&mut self, learning: impl Into<String>) {
        self.learnings.push_back(learning.into());
        truncate_front(&mut self.learnings, self.limits.max_learnings);
    }

    /// Share of successful action records, 1.0 when there are none
    pub fn success_rate(&self) -> f64 {
        if self.actions.is_empty() {
            return 1.0;
        }
        let successes = self.actions.iter().filter(|a| a.success).count();
        successes as f64 / self.actions.len() as f64
    }

    /// Amount spent on `day`
    pub fn spent_on(&self, day: NaiveDate) -> f64 {
        match self.spend {
            Some(spend) if spend.day == day => spend.total,
            _ => 0.0,
        }
    }

    /// Add `amount` to the spend of `day`, resetting on a new day
    pub fn record_spend(&mut self, day: NaiveDate, amount: f64) {
        let total = self.spent_on(day) + amount;
        self.spend = Some(DailySpend { day, total });
    }
}

fn truncate_front<T>(items: &mut VecDeque<T>, cap: usize) {
    while items.len() > cap {
        items.pop_front();
    }
}

/// Output of a decision source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    /// Chosen action
    pub action: ActionKind,
    /// Resolved parameters
    pub params: ActionParams,
    /// Human-readable reasoning
    pub reasoning: String,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Triggers that fired this cycle
    pub triggered_by: Vec<String>,
    /// Winning rule, if any
    #[serde(default)]
    pub rule_id: Option<String>,
}

impl Decision {
    /// The no-op decision
    pub fn none(reasoning: impl Into<String>, triggered_by: Vec<String>) -> Self {
        Self {
            action: ActionKind::None,
            params: ActionParams::new(),
            reasoning: reasoning.into(),
            confidence: 0.0,
            triggered_by,
            rule_id: None,
        }
    }
}

/// Outcome of one decision cycle
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExecutionResult {
    /// Agent the cycle ran for
    pub agent_id: AgentId,
    /// Decided action
    pub action: ActionKind,
    /// Decided parameters
    pub params: ActionParams,
    /// Decision reasoning
    pub reasoning: String,
    /// Decision confidence
    pub confidence: f64,
    /// Whether the action was carried out
    pub executed: bool,
    /// Whether the action was validated but only proposed
    #[serde(default)]
    pub proposed: bool,
    /// Transaction handle of the dispatched operation
    pub tx_handle: Option<TxHandle>,
    /// Failure message
    pub error: Option<String>,
}

impl ExecutionResult {
    /// Result of a cycle that did not get as far as a decision
    pub fn failed(agent_id: impl Into<AgentId>, error: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            action: ActionKind::None,
            params: ActionParams::new(),
            reasoning: String::new(),
            confidence: 0.0,
            executed: false,
            proposed: false,
            tx_handle: None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_symbol_ignores_case() {
        let mut state = ObservedState::new("0xagent", Utc::now());
        state.native_balance = 4.0;
        state.token_balances.insert("cUSD".to_string(), 9.0);

        assert_eq!(state.balance_of(Some("Native")), Some(4.0));
        assert_eq!(state.balance_of(None), Some(4.0));
        assert_eq!(state.balance_of(Some("cUSD")), Some(9.0));
        assert_eq!(state.balance_of(Some("CELO")), None);
    }

    fn record(success: bool) -> ActionRecord {
        ActionRecord {
            timestamp: Utc::now(),
            action: "transfer".to_string(),
            params: ActionParams::new(),
            result: String::new(),
            success,
        }
    }

    #[test]
    fn test_action_kind_round_trip_names() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>().ok(), Some(kind));
        }
        assert!(matches!(
            "teleport".parse::<ActionKind>(),
            Err(Error::UnknownAction(_))
        ));
    }

    #[test]
    fn test_memory_eviction_is_fifo() {
        let limits = MemoryLimits {
            max_observations: 2,
            max_actions: 2,
            max_learnings: 1,
        };
        let mut memory = AgentMemory::new("agent-1", Utc::now(), limits);
        for i in 0..5 {
            memory.push_learning(format!("learning {}", i));
            memory.push_action(record(i % 2 == 0));
        }
        assert_eq!(memory.learnings.len(), 1);
        assert_eq!(memory.learnings[0], "learning 4");
        assert_eq!(memory.actions.len(), 2);
    }

    #[test]
    fn test_success_rate() {
        let mut memory = AgentMemory::new("agent-1", Utc::now(), MemoryLimits::default());
        assert_eq!(memory.success_rate(), 1.0);
        memory.push_action(record(true));
        memory.push_action(record(false));
        assert_eq!(memory.success_rate(), 0.5);
    }

    #[test]
    fn test_daily_spend_resets_on_new_day() {
        let mut memory = AgentMemory::new("agent-1", Utc::now(), MemoryLimits::default());
        let day1 = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let day2 = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        memory.record_spend(day1, 2.0);
        memory.record_spend(day1, 1.5);
        assert_eq!(memory.spent_on(day1), 3.5);
        assert_eq!(memory.spent_on(day2), 0.0);
        memory.record_spend(day2, 1.0);
        assert_eq!(memory.spent_on(day2), 1.0);
    }

    #[test]
    fn test_config_update_merges_only_provided_fields() {
        let mut config = AgentConfig::new("grow cUSD savings");
        config.whitelist = vec!["0xabc".to_string()];
        let update = AgentConfigUpdate {
            execution_mode: Some(ExecutionMode::Propose),
            ..Default::default()
        };
        update.apply_to(&mut config);
        assert_eq!(config.execution_mode, ExecutionMode::Propose);
        assert_eq!(config.goal, "grow cUSD savings");
        assert_eq!(config.whitelist, vec!["0xabc".to_string()]);
    }

    #[test]
    fn test_counterparty_lists() {
        let mut config = AgentConfig::default();
        assert!(config.allows_counterparty("0xAAA"));
        config.blacklist = vec!["0xaaa".to_string()];
        assert!(!config.allows_counterparty("0xAAA"));
        config.whitelist = vec!["0xbbb".to_string()];
        assert!(config.allows_counterparty("0xBBB"));
        assert!(!config.allows_counterparty("0xccc"));
    }

    #[test]
    fn test_state_metric_prefers_token_scope() {
        let mut state = ObservedState::new("0x1", Utc::now());
        state.metrics.insert("price".to_string(), 1.0);
        state.metrics.insert("price:CELO".to_string(), 0.7);
        assert_eq!(state.metric("price", Some("CELO")), Some(0.7));
        assert_eq!(state.metric("price", Some("cUSD")), Some(1.0));
        assert_eq!(state.metric("apy", None), None);
    }
}
