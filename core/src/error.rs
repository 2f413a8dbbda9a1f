//! Error types for the agent orchestrator
//!
//! This module defines the error hierarchy shared by every crate in the
//! workspace: registry contract violations, catalog problems, per-trigger and
//! per-rule evaluation failures, validation rejections and failures surfaced
//! from the blockchain client.

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for orchestrator operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No configuration/memory exists for the agent
    #[error("Agent not registered: {0}")]
    AgentNotRegistered(String),

    /// The agent identifier is already taken
    #[error("Agent already registered: {0}")]
    AgentAlreadyRegistered(String),

    /// Action name has no handler
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    /// Local validation rejected a proposed action
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// A single trigger could not be evaluated
    #[error("Trigger {trigger_id} evaluation failed: {reason}")]
    TriggerEvaluation {
        /// Trigger identifier
        trigger_id: String,
        /// Failure description
        reason: String,
    },

    /// A single rule could not be evaluated
    #[error("Rule {rule_id} evaluation failed: {reason}")]
    RuleEvaluation {
        /// Rule identifier
        rule_id: String,
        /// Failure description
        reason: String,
    },

    /// Handler failed to submit the blockchain operation
    #[error("Dispatch error: {0}")]
    Dispatch(String),

    /// Blockchain client read failure
    #[error("Blockchain client error: {0}")]
    Client(String),

    /// Referenced scoring model does not exist
    #[error("Scoring model not found: {0}")]
    ModelNotFound(String),

    /// Malformed or dangling catalog entry
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Memory snapshot storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Timeout error
    #[error("Timeout: {0}")]
    Timeout(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a new validation failure
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationFailed(msg.into())
    }

    /// Create a new dispatch error
    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::Dispatch(msg.into())
    }

    /// Create a new blockchain client error
    pub fn client(msg: impl Into<String>) -> Self {
        Self::Client(msg.into())
    }

    /// Create a new catalog error
    pub fn catalog(msg: impl Into<String>) -> Self {
        Self::Catalog(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new trigger evaluation error
    pub fn trigger(trigger_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TriggerEvaluation {
            trigger_id: trigger_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a new rule evaluation error
    pub fn rule(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RuleEvaluation {
            rule_id: rule_id.into(),
            reason: reason.into(),
        }
    }

    /// Check if error is a local validation rejection
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::ValidationFailed(_))
    }

    /// Check if error violates the registry contract and must be raised to the caller
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Self::AgentNotRegistered(_) | Self::AgentAlreadyRegistered(_) | Self::Catalog(_)
        )
    }

    /// Check if error ends a cycle but is reported in the result instead of raised
    pub fn is_business_failure(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed(_)
                | Self::Dispatch(_)
                | Self::Client(_)
                | Self::UnknownAction(_)
                | Self::Timeout(_)
        )
    }

    /// Check if error is recoverable (the next scheduled cycle may succeed)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Client(_) | Self::Dispatch(_) | Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        assert!(Error::AgentNotRegistered("a".into()).is_contract_violation());
        assert!(!Error::AgentNotRegistered("a".into()).is_business_failure());
        assert!(Error::validation("amount must be positive").is_business_failure());
        assert!(Error::dispatch("reverted").is_recoverable());
        assert!(!Error::validation("x").is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::trigger("t-1", "missing metric price");
        assert_eq!(
            err.to_string(),
            "Trigger t-1 evaluation failed: missing metric price"
        );
        let err = Error::validation("missing field 'to'");
        assert_eq!(err.to_string(), "Validation failed: missing field 'to'");
    }
}
