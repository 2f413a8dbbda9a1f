//! Policy files
//!
//! A policy is one YAML (or JSON) document listing scoring models, triggers,
//! rules and agents. Loading it builds a [`Catalog`] and registers the agents
//! with an execution engine.
//!
//! ```yaml
//! models: []
//! triggers:
//!   - id: low-cusd
//!     name: Low cUSD balance
//!     config: { type: threshold, metric: balance, operator: lt, value: 1000, token: cUSD }
//! rules:
//!   - id: top-up
//!     name: Top up from native
//!     trigger_id: low-cusd
//!     actions:
//!       - type: swap
//!         config:
//!           from_token: native
//!           to_token: cUSD
//!           amount: { hint: optimal_amount }
//! agents:
//!   treasurer:
//!     goal: keep cUSD above 1000
//!     spending_limits: { daily: 50, per_tx: 10 }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use agent_orchestrator_core::{AgentConfig, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::Catalog;
use crate::engine::AgentExecutionEngine;
use crate::model::ScoringModel;
use crate::rule::DecisionRule;
use crate::trigger::Trigger;

/// Triggers, rules, models and agents loaded together
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyFile {
    /// Scoring models
    pub models: Vec<ScoringModel>,
    /// Triggers
    pub triggers: Vec<Trigger>,
    /// Rules
    pub rules: Vec<DecisionRule>,
    /// Agents by id
    pub agents: BTreeMap<String, AgentConfig>,
}

impl PolicyFile {
    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from a `.yaml`, `.yml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read policy {}: {}", path.display(), e)))?;

        match path.extension().and_then(|s| s.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml") | Some("yml") => Self::from_yaml_str(&content),
            _ => Err(Error::config(format!(
                "Unsupported policy file format: {}",
                path.display()
            ))),
        }
    }

    /// Build a catalog, checking every reference
    ///
    /// Models load first, then triggers, then rules, so a reference to an
    /// entry defined later in the same file still resolves.
    pub fn to_catalog(&self) -> Result<Catalog> {
        let mut catalog = Catalog::new();
        for model in &self.models {
            catalog.add_model(model.clone())?;
        }
        for trigger in &self.triggers {
            catalog.add_trigger(trigger.clone())?;
        }
        for rule in &self.rules {
            catalog.add_rule(rule.clone())?;
        }
        Ok(catalog)
    }

    /// Install the catalog into `engine` and register the agents
    pub async fn apply_to(&self, engine: AgentExecutionEngine) -> Result<AgentExecutionEngine> {
        let engine = engine.with_catalog(self.to_catalog()?);
        for (agent_id, config) in &self.agents {
            engine.register_agent(agent_id, config.clone()).await?;
        }

        let (triggers, rules, models) = engine.decision_engine().snapshot().counts();
        info!(
            triggers,
            rules,
            models,
            agents = self.agents.len(),
            "Policy applied"
        );
        Ok(engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_orchestrator_core::testing::RecordingClient;
    use agent_orchestrator_core::{ActionKind, OrchestratorConfig};
    use std::sync::Arc;
    use tempfile::tempdir;

    const POLICY: &str = r#"
models:
  - id: churn
    name: churn classifier
    kind: classification
    features: [success_rate, action_count]
    weights: [-2.0, 0.1]
    bias: 1.0
triggers:
  - id: low-cusd
    name: Low cUSD balance
    priority: 5
    config: { type: threshold, metric: balance, operator: lt, value: 1000, token: cUSD }
  - id: churn-risk
    name: Churn risk
    config: { type: ml_prediction, model_id: churn, threshold: 0.7 }
rules:
  - id: alert
    name: Alert on low balance
    trigger_id: low-cusd
    conditions:
      - { metric: "balance:cUSD", operator: lt, value: 800, weight: 0.5 }
    actions:
      - type: notify
        config:
          message: cUSD is running low
agents:
  treasurer:
    goal: keep cUSD above 1000
    spending_limits: { daily: 50, per_tx: 10 }
"#;

    #[test]
    fn test_policy_builds_catalog() {
        let policy = PolicyFile::from_yaml_str(POLICY).unwrap();
        let catalog = policy.to_catalog().unwrap();
        assert_eq!(catalog.counts(), (2, 1, 1));
        assert_eq!(
            catalog.rule("alert").unwrap().actions[0].action,
            ActionKind::Notify
        );
        assert_eq!(policy.agents["treasurer"].spending_limits.per_tx, 10.0);
    }

    #[test]
    fn test_rule_with_unknown_trigger_rejected() {
        let mut policy = PolicyFile::from_yaml_str(POLICY).unwrap();
        policy.rules[0].trigger_id = "missing".to_string();
        assert!(matches!(policy.to_catalog(), Err(Error::Catalog(_))));
    }

    #[test]
    fn test_policy_from_json_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("policy.json");
        let policy = PolicyFile::from_yaml_str(POLICY).unwrap();
        fs::write(&path, serde_json::to_string(&policy).unwrap()).unwrap();

        let loaded = PolicyFile::from_file(&path).unwrap();
        assert_eq!(loaded.triggers.len(), 2);
        assert!(PolicyFile::from_file(dir.path().join("policy.toml")).is_err());
    }

    #[tokio::test]
    async fn test_apply_registers_agents() {
        let policy = PolicyFile::from_yaml_str(POLICY).unwrap();
        let client = Arc::new(RecordingClient::new("0xagent", 1.0));
        let engine = AgentExecutionEngine::new(client, &OrchestratorConfig::default()).unwrap();

        let engine = policy.apply_to(engine).await.unwrap();
        assert_eq!(engine.agent_ids().await, vec!["treasurer".to_string()]);
        assert!(engine.decision_engine().snapshot().trigger("churn-risk").is_some());
    }
}
