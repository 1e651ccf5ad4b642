//! Orchestrator state definitions
//!
//! The polling loop moves `Polling -> ProcessingBatch -> (Polling | Done)`,
//! and straight from `Polling` to `Done` when a poll comes back empty.
use std::fmt;

/// Represents where the orchestrator is in its polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrchestratorState {
    /// Waiting on a receive from the queue
    Polling,

    /// Running the per-item pipeline over a received batch
    ProcessingBatch,

    /// Invocation finished; no further polls are issued
    Done,
}

impl OrchestratorState {
    /// Returns true if no further transitions are possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: OrchestratorState) -> bool {
        matches!(
            (self, next),
            (Self::Polling, Self::ProcessingBatch)
                | (Self::Polling, Self::Done)
                | (Self::ProcessingBatch, Self::Polling)
                | (Self::ProcessingBatch, Self::Done)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Polling => "polling",
            Self::ProcessingBatch => "processing_batch",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for OrchestratorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
