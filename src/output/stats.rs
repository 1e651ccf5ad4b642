//! Statistics gathered over one invocation
//!
//! The orchestrator records every batch, item outcome and acknowledgement
//! here; the totals are logged once the invocation reaches `Done`.

use crate::crawler::ExpansionReport;
use crate::state::{FailureKind, ItemOutcome};
use std::time::Duration;

/// Counters for a single invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStatistics {
    /// Number of receives that returned at least one message
    pub batches: u64,

    /// Total messages received
    pub messages_received: u64,

    /// Messages with an empty body, acknowledged without processing
    pub blank_messages: u64,

    /// Items whose pipeline completed
    pub items_imported: u64,

    /// Items left in the queue after a soft failure
    pub items_retried: u64,

    /// Items left in the queue because the lookup could not be fetched
    pub fetch_failures: u64,

    /// Items left in the queue because the store rejected the upsert
    pub persistence_failures: u64,

    /// Messages acknowledged
    pub messages_deleted: u64,

    /// Acknowledgements that failed (the message will be redelivered)
    pub delete_failures: u64,

    /// Related identifiers sent to the queue
    pub identifiers_enqueued: u64,

    /// Related identifiers skipped because they were already known
    pub identifiers_skipped: u64,

    /// Related identifier sends that failed and were ignored
    pub send_errors: u64,
}

impl RunStatistics {
    pub fn record_batch(&mut self, size: usize) {
        self.batches += 1;
        self.messages_received += size as u64;
    }

    pub fn record_blank(&mut self) {
        self.blank_messages += 1;
    }

    pub fn record_outcome(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Success(item) => {
                self.items_imported += 1;
                self.record_expansion(&item.expansion);
            }
            ItemOutcome::Retry(_) => self.items_retried += 1,
            ItemOutcome::Failure(FailureKind::Fetch(_)) => self.fetch_failures += 1,
            ItemOutcome::Failure(FailureKind::Persistence(_)) => self.persistence_failures += 1,
        }
    }

    pub fn record_expansion(&mut self, report: &ExpansionReport) {
        self.identifiers_enqueued += report.enqueued as u64;
        self.identifiers_skipped += report.skipped as u64;
        self.send_errors += report.errors as u64;
    }

    pub fn record_delete(&mut self, acknowledged: bool) {
        if acknowledged {
            self.messages_deleted += 1;
        } else {
            self.delete_failures += 1;
        }
    }

    /// Items that stayed in the queue for redelivery
    pub fn items_left_in_queue(&self) -> u64 {
        self.items_retried + self.fetch_failures + self.persistence_failures + self.delete_failures
    }

    /// Logs the totals at info level
    pub fn log_summary(&self, elapsed: Duration) {
        tracing::info!(
            "Invocation finished in {:.1}s: {} batches, {} messages, {} imported, {} left in queue",
            elapsed.as_secs_f64(),
            self.batches,
            self.messages_received,
            self.items_imported,
            self.items_left_in_queue()
        );
        if self.blank_messages > 0 {
            tracing::warn!("Discarded {} messages with an empty body", self.blank_messages);
        }
        tracing::info!(
            "Expansion: {} enqueued, {} already known, {} send errors",
            self.identifiers_enqueued,
            self.identifiers_skipped,
            self.send_errors
        );

        if self.fetch_failures > 0 || self.persistence_failures > 0 || self.delete_failures > 0 {
            tracing::warn!(
                "Failures: {} fetch, {} persistence, {} delete",
                self.fetch_failures,
                self.persistence_failures,
                self.delete_failures
            );
        }
    }
}
