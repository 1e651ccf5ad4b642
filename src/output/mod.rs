//! Output module for reporting invocation results
//!
//! This module accumulates per-invocation counters and reports them when an
//! invocation finishes.

pub mod stats;

pub use stats::RunStatistics;
