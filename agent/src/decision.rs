//! Decision engine
//!
//! Turns an agent's observed state and memory into a single [`Decision`]:
//! evaluate triggers, collect the rules bound to fired triggers, score them,
//! pick the best and instantiate its first applicable action template.
//!
//! A trigger or rule that fails to evaluate is logged and skipped; it can
//! never abort the evaluation of the others.

use std::cmp::Ordering;
use std::sync::{Arc, PoisonError, RwLock};

use agent_orchestrator_core::config::EngineSettings;
use agent_orchestrator_core::{Decision, Result};
use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::catalog::Catalog;
use crate::context::EvaluationContext;
use crate::model::ScoringModel;
use crate::rule::DecisionRule;
use crate::trigger::{Trigger, TriggerConfig};

/// Reasoning of the no-op decision
pub const NO_RULE_REASONING: &str = "no rule met threshold";

const SCORE_EPSILON: f64 = 1e-9;

/// A candidate rule with its score
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRule {
    /// Rule identifier
    pub rule_id: String,
    /// Aggregate condition score in [0, 1]
    pub score: f64,
    /// Rule priority
    pub priority: i32,
    /// Last time the rule was selected for this agent
    pub last_selected: Option<DateTime<Utc>>,
}

/// Ranking of candidates: higher score, then higher priority, then the rule
/// selected least recently (never selected first), then rule id
pub fn compare_candidates(a: &ScoredRule, b: &ScoredRule) -> Ordering {
    if (a.score - b.score).abs() > SCORE_EPSILON {
        return b.score.total_cmp(&a.score);
    }
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.last_selected.cmp(&b.last_selected))
        .then_with(|| a.rule_id.cmp(&b.rule_id))
}

/// Rule-based decision engine over a shared catalog
#[derive(Debug)]
pub struct DecisionEngine {
    catalog: RwLock<Arc<Catalog>>,
    settings: EngineSettings,
}

impl DecisionEngine {
    /// Engine with an empty catalog
    pub fn new(settings: EngineSettings) -> Self {
        Self::with_catalog(settings, Catalog::new())
    }

    /// Engine over an existing catalog
    pub fn with_catalog(settings: EngineSettings, catalog: Catalog) -> Self {
        Self {
            catalog: RwLock::new(Arc::new(catalog)),
            settings,
        }
    }

    /// Engine tuning
    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Consistent view of the catalog for one cycle
    pub fn snapshot(&self) -> Arc<Catalog> {
        let guard = self.catalog.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    fn update<T>(&self, change: impl FnOnce(&mut Catalog) -> Result<T>) -> Result<T> {
        let mut guard = self.catalog.write().unwrap_or_else(PoisonError::into_inner);
        let mut next = Catalog::clone(&guard);
        let out = change(&mut next)?;
        *guard = Arc::new(next);
        Ok(out)
    }

    /// Add a trigger, returning its id
    pub fn add_trigger(&self, trigger: Trigger) -> Result<String> {
        self.update(|c| c.add_trigger(trigger))
    }

    /// Add a rule bound to an existing trigger, returning its id
    pub fn add_rule(&self, rule: DecisionRule) -> Result<String> {
        self.update(|c| c.add_rule(rule))
    }

    /// Add a scoring model, returning its id
    pub fn add_model(&self, model: ScoringModel) -> Result<String> {
        self.update(|c| c.add_model(model))
    }

    /// Remove a trigger no rule references
    pub fn remove_trigger(&self, id: &str) -> Result<Trigger> {
        self.update(|c| c.remove_trigger(id))
    }

    /// Remove a rule
    pub fn remove_rule(&self, id: &str) -> Result<DecisionRule> {
        self.update(|c| c.remove_rule(id))
    }

    /// Remove a model no trigger references
    pub fn remove_model(&self, id: &str) -> Result<ScoringModel> {
        self.update(|c| c.remove_model(id))
    }

    /// Enable or disable a trigger
    pub fn set_trigger_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        self.update(|c| c.set_trigger_enabled(id, enabled))
    }

    /// Enable or disable a rule
    pub fn set_rule_enabled(&self, id: &str, enabled: bool) -> Result<()> {
        self.update(|c| c.set_rule_enabled(id, enabled))
    }

    /// Triggers firing in this context, by descending priority
    pub fn evaluate_triggers(&self, ctx: &EvaluationContext<'_>) -> Vec<Trigger> {
        fired_triggers(&self.snapshot(), ctx)
    }

    /// Produce one decision for the agent
    #[instrument(skip(self, ctx), fields(agent_id = ctx.agent_id))]
    pub fn generate_decision(&self, ctx: &EvaluationContext<'_>) -> Decision {
        let catalog = self.snapshot();
        let fired = fired_triggers(&catalog, ctx);
        let fired_ids: Vec<String> = fired.iter().map(|t| t.id.clone()).collect();
        if fired.is_empty() {
            debug!("No triggers fired");
            return Decision::none(NO_RULE_REASONING, fired_ids);
        }

        let mut scored = Vec::new();
        for rule in find_applicable_rules(&catalog, &fired) {
            match evaluate_rule_conditions(rule, ctx) {
                Ok(score) => {
                    debug!(rule_id = %rule.id, score, "Rule scored");
                    scored.push(ScoredRule {
                        rule_id: rule.id.clone(),
                        score,
                        priority: rule.priority,
                        last_selected: ctx.memory.rule_runs.get(&rule.id).copied(),
                    });
                }
                Err(e) => warn!(error = %e, "Skipping rule"),
            }
        }

        scored.retain(|s| s.score > self.settings.min_rule_score);
        scored.sort_by(compare_candidates);

        for candidate in &scored {
            let Some(rule) = catalog.rule(&candidate.rule_id) else {
                continue;
            };
            match execute_rule(rule, candidate.score, &fired_ids, ctx) {
                Ok(Some(decision)) => return decision,
                Ok(None) => debug!(rule_id = %rule.id, "No applicable action template"),
                Err(e) => warn!(error = %e, "Skipping rule"),
            }
        }

        Decision::none(NO_RULE_REASONING, fired_ids)
    }
}

/// Enabled triggers that fire, by descending priority; failures are logged and skipped
pub fn fired_triggers(catalog: &Catalog, ctx: &EvaluationContext<'_>) -> Vec<Trigger> {
    let mut fired = Vec::new();
    for trigger in catalog.enabled_triggers() {
        let model = match &trigger.config {
            TriggerConfig::MlPrediction { model_id, .. } => catalog.model(model_id),
            _ => None,
        };
        match trigger.evaluate(ctx, model) {
            Ok(true) => {
                debug!(trigger_id = %trigger.id, kind = %trigger.kind(), "Trigger fired");
                fired.push(trigger.clone());
            }
            Ok(false) => debug!(trigger_id = %trigger.id, "Trigger did not fire"),
            Err(e) => warn!(error = %e.for_trigger(&trigger.id), "Skipping trigger"),
        }
    }
    fired
}

/// Enabled rules bound to one of the fired triggers
pub fn find_applicable_rules<'c>(catalog: &'c Catalog, fired: &[Trigger]) -> Vec<&'c DecisionRule> {
    catalog
        .rules()
        .filter(|rule| rule.enabled && fired.iter().any(|t| t.id == rule.trigger_id))
        .collect()
}

/// Aggregate weighted score of the rule's conditions
pub fn evaluate_rule_conditions(rule: &DecisionRule, ctx: &EvaluationContext<'_>) -> Result<f64> {
    rule.score(ctx).map_err(|e| e.for_rule(&rule.id))
}

/// Best candidate under [`compare_candidates`]
pub fn select_best_rule(candidates: &[ScoredRule]) -> Option<&ScoredRule> {
    candidates.iter().min_by(|a, b| compare_candidates(a, b))
}

/// Build the decision from the rule's first applicable template
pub fn execute_rule(
    rule: &DecisionRule,
    score: f64,
    fired_ids: &[String],
    ctx: &EvaluationContext<'_>,
) -> Result<Option<Decision>> {
    let Some(template) = rule.applicable_action(ctx).map_err(|e| e.for_rule(&rule.id))? else {
        return Ok(None);
    };
    let action = template.instantiate(ctx).map_err(|e| e.for_rule(&rule.id))?;

    let mut reasoning = format!(
        "rule '{}' scored {:.2} after triggers [{}]",
        rule.name,
        score,
        fired_ids.join(", ")
    );
    for note in &action.notes {
        reasoning.push_str("; ");
        reasoning.push_str(note);
    }

    Ok(Some(Decision {
        action: action.action,
        params: action.params,
        reasoning,
        confidence: score.clamp(0.0, 1.0),
        triggered_by: fired_ids.to_vec(),
        rule_id: Some(rule.id.clone()),
    }))
}
