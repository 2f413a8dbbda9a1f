//! Evaluation context shared by triggers, rule conditions and scoring models
//!
//! Every named metric a policy can reference resolves here, so thresholds,
//! conditions and model features all read the world the same way.

use agent_orchestrator_core::config::EngineSettings;
use agent_orchestrator_core::{AgentConfig, AgentMemory, ObservedState};
pub use agent_orchestrator_core::NATIVE_TOKEN;
use chrono::{DateTime, Timelike, Utc};

use crate::error::{EvalError, EvalResult};
use crate::risk;

/// Read-only view of one agent at decision time
#[derive(Debug, Clone, Copy)]
pub struct EvaluationContext<'a> {
    /// Agent being evaluated
    pub agent_id: &'a str,
    /// State observed this cycle
    pub state: &'a ObservedState,
    /// Agent memory as of the start of the cycle
    pub memory: &'a AgentMemory,
    /// Agent configuration
    pub config: &'a AgentConfig,
    /// Engine tuning
    pub settings: &'a EngineSettings,
}

impl<'a> EvaluationContext<'a> {
    /// Evaluation time; the observation timestamp keeps evaluation repeatable
    pub fn now(&self) -> DateTime<Utc> {
        self.state.timestamp
    }

    /// Balance of `token`; without a token the default balance token is used
    /// when held, otherwise the native balance
    pub fn balance(&self, token: Option<&str>) -> Option<f64> {
        match token {
            Some(_) => self.state.balance_of(token),
            None => self
                .settings
                .default_balance_token
                .as_deref()
                .and_then(|symbol| self.state.token_balances.get(symbol).copied())
                .or(Some(self.state.native_balance)),
        }
    }

    /// Amount spent today, the larger of the on-chain and locally tracked totals
    pub fn spent_today(&self) -> f64 {
        let local = self.memory.spent_on(self.now().date_naive());
        self.state.daily_spent.unwrap_or(0.0).max(local)
    }

    /// Risk score of the agent in [0, 100]
    pub fn risk_score(&self) -> f64 {
        risk::risk_score(self.memory)
    }

    /// Resolve a named metric, optionally token scoped as `name:TOKEN`
    pub fn metric(&self, name: &str) -> EvalResult<f64> {
        let (base, token) = match name.split_once(':') {
            Some((base, token)) => (base, Some(token)),
            None => (name, None),
        };

        let value = match base {
            "balance" => self.balance(token),
            "native_balance" => Some(self.state.native_balance),
            "price" | "volume" | "apy" | "gas_price" => self.state.metric(base, token),
            "daily_spent" => Some(self.spent_today()),
            "success_rate" => Some(self.memory.success_rate()),
            "risk_score" => Some(self.risk_score()),
            "action_count" => Some(self.memory.actions.len() as f64),
            "tx_count" => Some(self.state.recent_transactions.len() as f64),
            "hour_of_day" => Some(f64::from(self.now().hour())),
            "hours_since_last_run" => {
                Some((self.now() - self.memory.last_run).num_seconds() as f64 / 3600.0)
            }
            _ => self.state.metrics.get(name).copied(),
        };

        value.ok_or_else(|| EvalError::MissingMetric(name.to_string()))
    }
}
