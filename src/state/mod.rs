//! State module for tracking invocation progress
//!
//! # Components
//!
//! - `OrchestratorState`: Where the polling loop currently is
//! - `SeenSet`: Identifiers enqueued during the current invocation
//! - `TimeBudget`: The invocation deadline
//! - `InvocationContext`: The per-invocation bundle threaded through the pipeline
//! - `ItemOutcome`: Result of a single item's pipeline

mod budget;
mod context;
mod orchestrator_state;
mod outcome;
mod seen_set;

// Re-export main types
pub use budget::TimeBudget;
pub use context::InvocationContext;
pub use orchestrator_state::OrchestratorState;
pub use outcome::{FailureKind, ItemOutcome, ProcessedItem, RetryReason};
pub use seen_set::SeenSet;
