use crate::output::RunStatistics;
use crate::state::{SeenSet, TimeBudget};
use std::time::Duration;

/// Everything scoped to a single invocation
///
/// Created when an invocation starts and threaded through every call that
/// needs it. Nothing in here outlives the invocation or is shared with
/// another one.
#[derive(Debug)]
pub struct InvocationContext {
    pub seen: SeenSet,
    pub budget: TimeBudget,
    pub stats: RunStatistics,
}

impl InvocationContext {
    /// Starts a new invocation with an empty seen-set and a fresh deadline
    pub fn start(budget: Duration) -> Self {
        Self {
            seen: SeenSet::new(),
            budget: TimeBudget::starting_now(budget),
            stats: RunStatistics::default(),
        }
    }
}
