//! Per-agent decision cycle state machine

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Phase of an agent's decision cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    /// No cycle in flight
    #[default]
    Idle,
    /// Reading on-chain state
    Observing,
    /// Waiting for the decision provider
    Deciding,
    /// Checking the decided action
    Validating,
    /// Dispatching the action
    Executing,
    /// Nothing to dispatch (`none` or propose mode)
    Skipped,
    /// Validation rejected the action
    Rejected,
    /// Writing memory
    Recording,
}

/// Input moving a cycle between phases
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleEvent {
    /// A cycle starts
    Start,
    /// State was observed
    Observed,
    /// A decision is available
    Decided,
    /// The action passed validation and will be dispatched
    Approved,
    /// The action passed validation but is not dispatched
    Skip,
    /// The action failed validation
    Reject,
    /// Dispatch finished, successfully or not
    Dispatched,
    /// Observation, decision or dispatch raised an error
    Failed,
    /// Recording starts after a skipped or rejected action
    Record,
    /// Memory was written
    Recorded,
}

/// Event not accepted in the current phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid cycle transition from {from} on {event:?}")]
pub struct TransitionError {
    /// Phase the event arrived in
    pub from: CyclePhase,
    /// Rejected event
    pub event: CycleEvent,
}

impl CyclePhase {
    /// Next phase for `event`
    pub fn transition(self, event: CycleEvent) -> Result<CyclePhase, TransitionError> {
        use CycleEvent as E;
        use CyclePhase as P;

        match (self, event) {
            (P::Idle, E::Start) => Ok(P::Observing),
            (P::Observing, E::Observed) => Ok(P::Deciding),
            (P::Deciding, E::Decided) => Ok(P::Validating),
            (P::Validating, E::Approved) => Ok(P::Executing),
            (P::Validating, E::Skip) => Ok(P::Skipped),
            (P::Validating, E::Reject) => Ok(P::Rejected),
            (P::Executing, E::Dispatched) => Ok(P::Recording),
            (P::Skipped, E::Record) | (P::Rejected, E::Record) => Ok(P::Recording),
            (P::Observing | P::Deciding | P::Validating | P::Executing, E::Failed) => {
                Ok(P::Recording)
            }
            (P::Recording, E::Recorded) => Ok(P::Idle),
            (from, event) => Err(TransitionError { from, event }),
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CyclePhase::Idle => "idle",
            CyclePhase::Observing => "observing",
            CyclePhase::Deciding => "deciding",
            CyclePhase::Validating => "validating",
            CyclePhase::Executing => "executing",
            CyclePhase::Skipped => "skipped",
            CyclePhase::Rejected => "rejected",
            CyclePhase::Recording => "recording",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(events: &[CycleEvent]) -> Result<CyclePhase, TransitionError> {
        events
            .iter()
            .try_fold(CyclePhase::Idle, |phase, event| phase.transition(*event))
    }

    #[test]
    fn test_executed_cycle_returns_to_idle() {
        use CycleEvent::*;
        let phase = run(&[Start, Observed, Decided, Approved, Dispatched, Recorded]).unwrap();
        assert_eq!(phase, CyclePhase::Idle);
    }

    #[test]
    fn test_skipped_and_rejected_cycles() {
        use CycleEvent::*;
        assert_eq!(
            run(&[Start, Observed, Decided, Skip, Record]).unwrap(),
            CyclePhase::Recording
        );
        assert_eq!(
            run(&[Start, Observed, Decided, Reject, Record, Recorded]).unwrap(),
            CyclePhase::Idle
        );
    }

    #[test]
    fn test_failure_goes_to_recording() {
        use CycleEvent::*;
        assert_eq!(run(&[Start, Failed]).unwrap(), CyclePhase::Recording);
    }

    #[test]
    fn test_out_of_order_events_rejected() {
        let err = CyclePhase::Idle.transition(CycleEvent::Decided).unwrap_err();
        assert_eq!(err.from, CyclePhase::Idle);
        assert!(CyclePhase::Executing.transition(CycleEvent::Start).is_err());
    }
}
