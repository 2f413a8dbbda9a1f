//! Prometheus counters for decision cycles

use agent_orchestrator_core::{Error, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

/// Outcome label of a finished cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Action dispatched successfully
    Executed,
    /// Action validated and proposed
    Proposed,
    /// Nothing to do
    Skipped,
    /// Validation rejected the action
    Rejected,
    /// Observation, decision or dispatch failed
    Failed,
}

impl CycleOutcome {
    /// Label value
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleOutcome::Executed => "executed",
            CycleOutcome::Proposed => "proposed",
            CycleOutcome::Skipped => "skipped",
            CycleOutcome::Rejected => "rejected",
            CycleOutcome::Failed => "failed",
        }
    }
}

/// Counters registered on their own registry
#[derive(Clone)]
pub struct EngineMetrics {
    registry: Registry,
    cycles: IntCounter,
    outcomes: IntCounterVec,
    fired_triggers: IntCounterVec,
}

impl std::fmt::Debug for EngineMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineMetrics")
            .field("cycles", &self.cycles.get())
            .finish_non_exhaustive()
    }
}

fn registration(e: prometheus::Error) -> Error {
    Error::config(format!("Failed to register metric: {}", e))
}

impl EngineMetrics {
    /// Create and register the counters
    pub fn new() -> Result<Self> {
        let registry = Registry::new();

        let cycles = IntCounter::new(
            "agent_orchestrator_cycles_total",
            "Total number of decision cycles run",
        )
        .map_err(registration)?;

        let outcomes = IntCounterVec::new(
            Opts::new(
                "agent_orchestrator_cycle_outcomes_total",
                "Decision cycles by outcome and action",
            ),
            &["outcome", "action"],
        )
        .map_err(registration)?;

        let fired_triggers = IntCounterVec::new(
            Opts::new(
                "agent_orchestrator_fired_triggers_total",
                "Triggers that fired, by trigger id",
            ),
            &["trigger_id"],
        )
        .map_err(registration)?;

        registry.register(Box::new(cycles.clone())).map_err(registration)?;
        registry.register(Box::new(outcomes.clone())).map_err(registration)?;
        registry
            .register(Box::new(fired_triggers.clone()))
            .map_err(registration)?;

        Ok(Self {
            registry,
            cycles,
            outcomes,
            fired_triggers,
        })
    }

    /// Record one finished cycle
    pub fn record_cycle(&self, outcome: CycleOutcome, action: &str, fired: &[String]) {
        self.cycles.inc();
        self.outcomes
            .with_label_values(&[outcome.as_str(), action])
            .inc();
        for trigger_id in fired {
            self.fired_triggers
                .with_label_values(&[trigger_id.as_str()])
                .inc();
        }
    }

    /// Number of cycles recorded
    pub fn cycles(&self) -> u64 {
        self.cycles.get()
    }

    /// Count for one outcome and action
    pub fn outcome_count(&self, outcome: CycleOutcome, action: &str) -> u64 {
        self.outcomes
            .with_label_values(&[outcome.as_str(), action])
            .get()
    }

    /// Text exposition of all counters
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(registration)?;
        String::from_utf8(buffer).map_err(|e| Error::config(e.to_string()))
    }
}
