//! Trigger, rule and model catalogs
//!
//! The catalog is plain data. The decision engine keeps it behind a
//! copy-on-write handle so a cycle reads one consistent snapshot while
//! administrative changes become visible to the next cycle.

use std::collections::BTreeMap;

use agent_orchestrator_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::model::ScoringModel;
use crate::rule::DecisionRule;
use crate::trigger::{Trigger, TriggerConfig};

/// Process-wide triggers, rules and scoring models
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    triggers: BTreeMap<String, Trigger>,
    rules: BTreeMap<String, DecisionRule>,
    models: BTreeMap<String, ScoringModel>,
}

fn assign_id(id: &mut String) {
    if id.trim().is_empty() {
        *id = Uuid::new_v4().to_string();
    }
}

impl Catalog {
    /// Empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a trigger, returning its id
    pub fn add_trigger(&mut self, mut trigger: Trigger) -> Result<String> {
        assign_id(&mut trigger.id);
        if self.triggers.contains_key(&trigger.id) {
            return Err(Error::catalog(format!("trigger '{}' already exists", trigger.id)));
        }
        if let TriggerConfig::MlPrediction { model_id, .. } = &trigger.config {
            if !self.models.contains_key(model_id) {
                return Err(Error::ModelNotFound(model_id.clone()));
            }
        }
        debug!(trigger_id = %trigger.id, kind = %trigger.kind(), "Trigger added");
        let id = trigger.id.clone();
        self.triggers.insert(id.clone(), trigger);
        Ok(id)
    }

    /// Add a rule bound to an existing trigger, returning its id
    pub fn add_rule(&mut self, mut rule: DecisionRule) -> Result<String> {
        assign_id(&mut rule.id);
        if self.rules.contains_key(&rule.id) {
            return Err(Error::catalog(format!("rule '{}' already exists", rule.id)));
        }
        if !self.triggers.contains_key(&rule.trigger_id) {
            return Err(Error::catalog(format!(
                "rule '{}' references unknown trigger '{}'",
                rule.id, rule.trigger_id
            )));
        }
        rule.check()
            .map_err(|e| Error::catalog(format!("rule '{}': {}", rule.id, e)))?;
        debug!(rule_id = %rule.id, trigger_id = %rule.trigger_id, "Rule added");
        let id = rule.id.clone();
        self.rules.insert(id.clone(), rule);
        Ok(id)
    }

    /// Add a scoring model, returning its id
    pub fn add_model(&mut self, mut model: ScoringModel) -> Result<String> {
        assign_id(&mut model.id);
        if self.models.contains_key(&model.id) {
            return Err(Error::catalog(format!("model '{}' already exists", model.id)));
        }
        model
            .check()
            .map_err(|e| Error::catalog(format!("model '{}': {}", model.id, e)))?;
        debug!(model_id = %model.id, "Model added");
        let id = model.id.clone();
        self.models.insert(id.clone(), model);
        Ok(id)
    }

    /// Remove a trigger no rule references
    pub fn remove_trigger(&mut self, id: &str) -> Result<Trigger> {
        if let Some(rule) = self.rules.values().find(|r| r.trigger_id == id) {
            return Err(Error::catalog(format!(
                "trigger '{}' is still used by rule '{}'",
                id, rule.id
            )));
        }
        self.triggers
            .remove(id)
            .ok_or_else(|| Error::catalog(format!("unknown trigger '{}'", id)))
    }

    /// Remove a rule
    pub fn remove_rule(&mut self, id: &str) -> Result<DecisionRule> {
        self.rules
            .remove(id)
            .ok_or_else(|| Error::catalog(format!("unknown rule '{}'", id)))
    }

    /// Remove a model no trigger references
    pub fn remove_model(&mut self, id: &str) -> Result<ScoringModel> {
        let in_use = self.triggers.values().find(|t| {
            matches!(&t.config, TriggerConfig::MlPrediction { model_id, .. } if model_id == id)
        });
        if let Some(trigger) = in_use {
            return Err(Error::catalog(format!(
                "model '{}' is still used by trigger '{}'",
                id, trigger.id
            )));
        }
        self.models
            .remove(id)
            .ok_or_else(|| Error::ModelNotFound(id.to_string()))
    }

    /// Enable or disable a trigger
    pub fn set_trigger_enabled(&mut self, id: &str, enabled: bool) -> Result<()> {
        let trigger = self
            .triggers
            .get_mut(id)
            .ok_or_else(|| Error::catalog(format!("unknown trigger '{}'", id)))?;
        trigger.enabled = enabled;
        Ok(())
    }

    /// Enable or disable a rule
    pub fn set_rule_enabled(&mut self, id: &str, enabled: bool) -> Result<()> {
        let rule = self
            .rules
            .get_mut(id)
            .ok_or_else(|| Error::catalog(format!("unknown rule '{}'", id)))?;
        rule.enabled = enabled;
        Ok(())
    }

    /// Trigger by id
    pub fn trigger(&self, id: &str) -> Option<&Trigger> {
        self.triggers.get(id)
    }

    /// Rule by id
    pub fn rule(&self, id: &str) -> Option<&DecisionRule> {
        self.rules.get(id)
    }

    /// Model by id
    pub fn model(&self, id: &str) -> Option<&ScoringModel> {
        self.models.get(id)
    }

    /// Enabled triggers by descending priority, then id
    pub fn enabled_triggers(&self) -> Vec<&Trigger> {
        let mut triggers: Vec<&Trigger> = self.triggers.values().filter(|t| t.enabled).collect();
        triggers.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
        triggers
    }

    /// All rules
    pub fn rules(&self) -> impl Iterator<Item = &DecisionRule> {
        self.rules.values()
    }

    /// All triggers
    pub fn triggers(&self) -> impl Iterator<Item = &Trigger> {
        self.triggers.values()
    }

    /// All models
    pub fn models(&self) -> impl Iterator<Item = &ScoringModel> {
        self.models.values()
    }

    /// Number of triggers, rules and models
    pub fn counts(&self) -> (usize, usize, usize) {
        (self.triggers.len(), self.rules.len(), self.models.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::ActionTemplate;
    use crate::trigger::{Comparison, Metric};
    use agent_orchestrator_core::ActionKind;

    fn threshold(id: &str, priority: i32) -> Trigger {
        Trigger::new(
            id,
            id,
            TriggerConfig::Threshold {
                metric: Metric::Balance,
                operator: Comparison::Lt,
                value: 10.0,
                token: None,
            },
        )
        .with_priority(priority)
    }

    #[test]
    fn test_rule_requires_existing_trigger() {
        let mut catalog = Catalog::new();
        let rule = DecisionRule::new("r1", "r1", "missing", ActionTemplate::new(ActionKind::Claim));
        assert!(matches!(catalog.add_rule(rule.clone()), Err(Error::Catalog(_))));

        catalog.add_trigger(threshold("missing", 0)).unwrap();
        assert_eq!(catalog.add_rule(rule).unwrap(), "r1");
    }

    #[test]
    fn test_empty_ids_are_generated() {
        let mut catalog = Catalog::new();
        let id = catalog.add_trigger(threshold("", 0)).unwrap();
        assert!(Uuid::parse_str(&id).is_ok());
        assert!(catalog.trigger(&id).is_some());
    }

    #[test]
    fn test_enabled_triggers_by_priority() {
        let mut catalog = Catalog::new();
        catalog.add_trigger(threshold("low", 1)).unwrap();
        catalog.add_trigger(threshold("high", 9)).unwrap();
        catalog.add_trigger(threshold("off", 5)).unwrap();
        catalog.set_trigger_enabled("off", false).unwrap();

        let ids: Vec<&str> = catalog.enabled_triggers().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "low"]);
    }

    #[test]
    fn test_referenced_trigger_cannot_be_removed() {
        let mut catalog = Catalog::new();
        catalog.add_trigger(threshold("t", 0)).unwrap();
        catalog
            .add_rule(DecisionRule::new("r", "r", "t", ActionTemplate::new(ActionKind::Claim)))
            .unwrap();
        assert!(catalog.remove_trigger("t").is_err());
        catalog.remove_rule("r").unwrap();
        assert!(catalog.remove_trigger("t").is_ok());
    }

    #[test]
    fn test_ml_trigger_requires_model() {
        let mut catalog = Catalog::new();
        let trigger = Trigger::new(
            "ml",
            "ml",
            TriggerConfig::MlPrediction {
                model_id: "m".to_string(),
                features: vec![],
                threshold: Some(0.5),
            },
        );
        assert!(matches!(catalog.add_trigger(trigger), Err(Error::ModelNotFound(_))));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut catalog = Catalog::new();
        catalog.add_trigger(threshold("t", 0)).unwrap();
        assert!(catalog.add_trigger(threshold("t", 0)).is_err());
    }
}
