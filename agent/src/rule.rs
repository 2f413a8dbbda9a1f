//! Decision rules, weighted conditions and action templates

use std::collections::BTreeMap;

use agent_orchestrator_core::{ActionKind, ActionParams};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::context::EvaluationContext;
use crate::error::{EvalError, EvalResult};
use crate::risk;
use crate::trigger::Comparison;

fn default_weight() -> f64 {
    1.0
}

fn default_enabled() -> bool {
    true
}

/// Weighted condition contributing to a rule's score
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionCondition {
    /// Metric name, optionally token scoped as `name:TOKEN`
    pub metric: String,
    /// Comparison operator
    pub operator: Comparison,
    /// Expected value
    pub value: f64,
    /// Weight in [0, 1]
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl DecisionCondition {
    /// Condition with weight 1
    pub fn new(metric: impl Into<String>, operator: Comparison, value: f64) -> Self {
        Self {
            metric: metric.into(),
            operator,
            value,
            weight: 1.0,
        }
    }

    /// Set the weight
    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Graded match in [0, 1]
    pub fn match_strength(&self, ctx: &EvaluationContext<'_>) -> EvalResult<f64> {
        let actual = ctx.metric(&self.metric)?;
        Ok(self.operator.match_strength(actual, self.value))
    }

    /// Whether the comparison holds outright
    pub fn holds(&self, ctx: &EvaluationContext<'_>) -> EvalResult<bool> {
        let actual = ctx.metric(&self.metric)?;
        Ok(self.operator.holds(actual, self.value))
    }
}

/// Value computed from the current state when a template is instantiated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisHint {
    /// Share of the available balance scaled down by risk, capped by the per-tx limit
    OptimalAmount,
    /// Whole available balance of the action's token
    AvailableBalance,
    /// Token chosen from the agent's goal and holdings
    SelectedToken,
    /// Address the agent acts for
    AgentAddress,
    /// Configured emergency wallet
    EmergencyWallet,
}

impl SynthesisHint {
    fn depends_on_token(&self) -> bool {
        matches!(self, SynthesisHint::OptimalAmount | SynthesisHint::AvailableBalance)
    }
}

/// Template value: a synthesis hint or a literal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParamTemplate {
    /// `{ hint: optimal_amount }`
    Hint {
        /// Hint to resolve
        hint: SynthesisHint,
    },
    /// Any literal JSON/YAML value
    Literal(Value),
}

/// Candidate action of a rule
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionTemplate {
    /// Action to take
    #[serde(rename = "type")]
    pub action: ActionKind,
    /// Parameters, literal or synthesized
    #[serde(default)]
    pub config: BTreeMap<String, ParamTemplate>,
    /// Conditions that must all hold for this template to apply
    #[serde(default)]
    pub conditions: Vec<DecisionCondition>,
    /// Send to the emergency wallet instead when risk is high
    #[serde(default)]
    pub emergency_fallback: bool,
}

/// Concrete action produced from a template
#[derive(Debug, Clone, PartialEq)]
pub struct InstantiatedAction {
    /// Action to take
    pub action: ActionKind,
    /// Resolved parameters
    pub params: ActionParams,
    /// Remarks appended to the decision reasoning
    pub notes: Vec<String>,
}

impl ActionTemplate {
    /// Template with no parameters
    pub fn new(action: ActionKind) -> Self {
        Self {
            action,
            config: BTreeMap::new(),
            conditions: Vec::new(),
            emergency_fallback: false,
        }
    }

    /// Add a literal parameter
    pub fn with_param(mut self, key: impl Into<String>, value: Value) -> Self {
        self.config.insert(key.into(), ParamTemplate::Literal(value));
        self
    }

    /// Add a synthesized parameter
    pub fn with_hint(mut self, key: impl Into<String>, hint: SynthesisHint) -> Self {
        self.config.insert(key.into(), ParamTemplate::Hint { hint });
        self
    }

    /// Whether all template conditions hold
    pub fn applies(&self, ctx: &EvaluationContext<'_>) -> EvalResult<bool> {
        for condition in &self.conditions {
            if !condition.holds(ctx)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Resolve literals and hints against the current state
    pub fn instantiate(&self, ctx: &EvaluationContext<'_>) -> EvalResult<InstantiatedAction> {
        let risk = ctx.risk_score();
        let mut params = ActionParams::new();
        let mut notes = Vec::new();

        // Token-independent values first; amounts read the resolved token.
        let (deferred, immediate): (Vec<_>, Vec<_>) = self.config.iter().partition(|(_, t)| {
            matches!(t, ParamTemplate::Hint { hint } if hint.depends_on_token())
        });

        for (key, template) in immediate.into_iter().chain(deferred) {
            let value = match template {
                ParamTemplate::Literal(value) => value.clone(),
                ParamTemplate::Hint { hint } => resolve_hint(*hint, key, &params, ctx, risk)?,
            };
            params.insert(key.clone(), value);
        }

        let high_risk = risk >= ctx.settings.high_risk_threshold;
        if self.emergency_fallback && high_risk {
            if let Some(wallet) = &ctx.config.emergency_wallet {
                params.insert("to".to_string(), json!(wallet));
                notes.push(format!(
                    "risk score {:.0} is high, redirecting to emergency wallet",
                    risk
                ));
            }
        }

        Ok(InstantiatedAction {
            action: self.action,
            params,
            notes,
        })
    }
}

fn resolve_hint(
    hint: SynthesisHint,
    key: &str,
    params: &ActionParams,
    ctx: &EvaluationContext<'_>,
    risk: f64,
) -> EvalResult<Value> {
    match hint {
        SynthesisHint::OptimalAmount => {
            let available = token_balance(params, ctx, key)?;
            let amount =
                risk::optimal_amount(available, risk, ctx.config.spending_limits.per_tx);
            if amount <= 0.0 {
                return Err(EvalError::unresolved(key, "no balance available"));
            }
            Ok(json!(amount))
        }
        SynthesisHint::AvailableBalance => Ok(json!(token_balance(params, ctx, key)?)),
        SynthesisHint::SelectedToken => risk::select_token(ctx.config, ctx.state, ctx.settings)
            .map(Value::String)
            .ok_or_else(|| EvalError::unresolved(key, "no token to select")),
        SynthesisHint::AgentAddress => Ok(json!(ctx.state.address)),
        SynthesisHint::EmergencyWallet => ctx
            .config
            .emergency_wallet
            .clone()
            .map(Value::String)
            .ok_or_else(|| EvalError::unresolved(key, "no emergency wallet configured")),
    }
}

/// Balance of the token named by `from_token` or `token`, else the default balance
fn token_balance(params: &ActionParams, ctx: &EvaluationContext<'_>, key: &str) -> EvalResult<f64> {
    let token = params
        .get("from_token")
        .or_else(|| params.get("token"))
        .and_then(Value::as_str);
    ctx.balance(token).ok_or_else(|| {
        EvalError::unresolved(key, format!("no balance for {}", token.unwrap_or("default token")))
    })
}

/// A rule mapping a fired trigger to candidate actions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionRule {
    /// Rule identifier (generated when empty)
    #[serde(default)]
    pub id: String,
    /// Display name
    pub name: String,
    /// Trigger that must fire for the rule to be a candidate
    pub trigger_id: String,
    /// Weighted conditions
    #[serde(default)]
    pub conditions: Vec<DecisionCondition>,
    /// Candidate actions, first applicable wins
    pub actions: Vec<ActionTemplate>,
    /// Higher priority wins ties
    #[serde(default)]
    pub priority: i32,
    /// Disabled rules are never candidates
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl DecisionRule {
    /// Enabled rule with priority 0 and no conditions
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        trigger_id: impl Into<String>,
        action: ActionTemplate,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            trigger_id: trigger_id.into(),
            conditions: Vec::new(),
            actions: vec![action],
            priority: 0,
            enabled: true,
        }
    }

    /// Add a condition
    pub fn with_condition(mut self, condition: DecisionCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Structural checks independent of the state
    pub fn check(&self) -> EvalResult<()> {
        if self.actions.is_empty() {
            return Err(EvalError::malformed(format!("rule '{}' has no actions", self.id)));
        }
        if let Some(c) = self
            .conditions
            .iter()
            .find(|c| !c.weight.is_finite() || !(0.0..=1.0).contains(&c.weight))
        {
            return Err(EvalError::malformed(format!(
                "condition on '{}' has weight {} outside [0, 1]",
                c.metric, c.weight
            )));
        }
        Ok(())
    }

    /// `sum(weight * match) / sum(weight)`; 1.0 for a rule without conditions
    pub fn score(&self, ctx: &EvaluationContext<'_>) -> EvalResult<f64> {
        self.check()?;
        if self.conditions.is_empty() {
            return Ok(1.0);
        }

        let total_weight: f64 = self.conditions.iter().map(|c| c.weight).sum();
        if total_weight <= 0.0 {
            return Err(EvalError::malformed(format!(
                "rule '{}' conditions carry no weight",
                self.id
            )));
        }

        let mut weighted = 0.0;
        for condition in &self.conditions {
            weighted += condition.weight * condition.match_strength(ctx)?;
        }
        Ok((weighted / total_weight).clamp(0.0, 1.0))
    }

    /// First template whose conditions hold
    pub fn applicable_action(&self, ctx: &EvaluationContext<'_>) -> EvalResult<Option<&ActionTemplate>> {
        for template in &self.actions {
            if template.applies(ctx)? {
                return Ok(Some(template));
            }
        }
        Ok(None)
    }
}
