//! Evaluation errors raised while scoring a single trigger, rule or model
//!
//! These never escape a decision cycle on their own: the decision engine wraps
//! them into [`Error::TriggerEvaluation`] or [`Error::RuleEvaluation`] for the
//! offending catalog entry and carries on with the others.

use agent_orchestrator_core::Error;
use thiserror::Error;

/// Result of evaluating one catalog entry
pub type EvalResult<T> = std::result::Result<T, EvalError>;

/// Reasons a single trigger, rule or model cannot be evaluated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// The observed state does not carry the metric
    #[error("metric '{0}' is not available")]
    MissingMetric(String),

    /// The entry's configuration cannot be interpreted
    #[error("malformed configuration: {0}")]
    Malformed(String),

    /// A referenced scoring model does not exist
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The model rejected its input
    #[error("model error: {0}")]
    Model(String),

    /// A parameter synthesis hint could not be resolved
    #[error("cannot resolve '{param}': {reason}")]
    Unresolved {
        /// Parameter being synthesized
        param: String,
        /// Why it failed
        reason: String,
    },
}

impl EvalError {
    /// Create a malformed-configuration error
    pub fn malformed(msg: impl Into<String>) -> Self {
        EvalError::Malformed(msg.into())
    }

    /// Create a model error
    pub fn model(msg: impl Into<String>) -> Self {
        EvalError::Model(msg.into())
    }

    /// Create an unresolved-parameter error
    pub fn unresolved(param: impl Into<String>, reason: impl Into<String>) -> Self {
        EvalError::Unresolved {
            param: param.into(),
            reason: reason.into(),
        }
    }

    /// Attach to the trigger that failed
    pub fn for_trigger(self, trigger_id: &str) -> Error {
        Error::trigger(trigger_id, self.to_string())
    }

    /// Attach to the rule that failed
    pub fn for_rule(self, rule_id: &str) -> Error {
        Error::rule(rule_id, self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapping_keeps_entry_id() {
        let err = EvalError::MissingMetric("apy".to_string()).for_rule("rule-7");
        match err {
            Error::RuleEvaluation { rule_id, reason } => {
                assert_eq!(rule_id, "rule-7");
                assert!(reason.contains("apy"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
