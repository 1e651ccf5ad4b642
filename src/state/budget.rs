use std::time::{Duration, Instant};

/// Wall-clock budget for one invocation
///
/// The deadline is fixed when the invocation starts. It is only consulted
/// between batches, so a slow batch may overrun it.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    started_at: Instant,
    deadline: Instant,
}

impl TimeBudget {
    /// Starts a budget of `duration` from now
    pub fn starting_now(duration: Duration) -> Self {
        let started_at = Instant::now();
        Self {
            started_at,
            deadline: started_at + duration,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Time left before the deadline, zero once it has passed
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_exhausted(&self) -> bool {
        self.is_exhausted_at(Instant::now())
    }

    pub fn is_exhausted_at(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}
