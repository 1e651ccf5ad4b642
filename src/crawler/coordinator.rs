//! Crawler coordinator - the invocation polling loop
//!
//! This module drives one invocation from start to finish:
//! - Polling the queue for batches
//! - Running each message through fetch, import and expansion
//! - Deleting messages whose pipeline succeeded
//! - Stopping on an empty poll, an exhausted budget or a single-batch policy

use crate::config::{Config, DrainMode};
use crate::crawler::expansion::expand;
use crate::crawler::fetcher::{Fetcher, Lookup};
use crate::crawler::parser::LookupResult;
use crate::output::RunStatistics;
use crate::queue::{QueueClient, QueueMessage, SqsTransport};
use crate::signing::HmacSha256Signer;
use crate::state::{
    FailureKind, InvocationContext, ItemOutcome, OrchestratorState, ProcessedItem, RetryReason,
};
use crate::storage::{CatalogStore, ImportOutcome, Importer, SqliteCatalog};
use crate::{CrawlError, Result};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Status string returned to the host when an invocation completes
pub const TERMINAL_STATUS: &str = "Done";

/// Polling policy for an invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    pub max_messages: u32,
    pub wait_seconds: u32,
    pub time_budget: Duration,
    pub drain_mode: DrainMode,
}

impl RunSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_messages: config.queue.max_messages,
            wait_seconds: config.queue.wait_seconds,
            time_budget: config.run.time_budget(),
            drain_mode: config.run.drain_mode,
        }
    }
}

/// Why an invocation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// A poll returned no messages
    NoMoreWork,

    /// The time budget ran out between batches
    BudgetExhausted,

    /// Drain mode is single-batch and the batch was processed
    SingleBatchComplete,
}

impl RunStatus {
    /// Every completed invocation reports the same status to the host
    pub fn terminal_status(&self) -> &'static str {
        TERMINAL_STATUS
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMoreWork => write!(f, "no more work"),
            Self::BudgetExhausted => write!(f, "time budget exhausted"),
            Self::SingleBatchComplete => write!(f, "single batch complete"),
        }
    }
}

/// Result of a completed invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub status: RunStatus,
    pub stats: RunStatistics,
}

/// Main coordinator structure
pub struct Coordinator {
    queue: QueueClient,
    lookup: Arc<dyn Lookup>,
    importer: Importer,
    settings: RunSettings,
}

impl Coordinator {
    pub fn new(
        queue: QueueClient,
        lookup: Arc<dyn Lookup>,
        importer: Importer,
        settings: RunSettings,
    ) -> Self {
        Self {
            queue,
            lookup,
            importer,
            settings,
        }
    }

    /// Wires the production collaborators from configuration
    ///
    /// Opens the SQLite catalog, builds the SQS transport from the ambient
    /// AWS configuration and signs lookups with HMAC-SHA256.
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to run
    /// * `Err(CrawlError)` - The catalog could not be opened or the endpoint is unusable
    pub async fn from_config(config: &Config) -> Result<Self> {
        let catalog: Arc<dyn CatalogStore> = Arc::new(SqliteCatalog::open(Path::new(
            &config.catalog.database_path,
        ))?);
        let transport = Arc::new(SqsTransport::from_config(&config.queue).await);
        let signer = Arc::new(HmacSha256Signer::new(&config.lookup.secret_key));
        let fetcher = Fetcher::new(&config.lookup, signer)?;

        Ok(Self::new(
            QueueClient::new(transport, catalog.clone()),
            Arc::new(fetcher),
            Importer::new(catalog),
            RunSettings::from_config(config),
        ))
    }

    /// Creates the context for a new invocation
    pub fn start_invocation(&self) -> InvocationContext {
        InvocationContext::start(self.settings.time_budget)
    }

    /// Enqueues seed identifiers that are not already known
    ///
    /// Returns how many were actually sent.
    pub async fn seed(&self, identifiers: &[String], ctx: &InvocationContext) -> Result<usize> {
        let mut sent = 0;
        for identifier in identifiers {
            if self.queue.send_if_absent(identifier, &ctx.seen).await? {
                sent += 1;
            } else {
                tracing::info!("Seed {} is already known, skipping", identifier);
            }
        }
        Ok(sent)
    }

    /// Runs one invocation with a fresh context
    pub async fn run(&self) -> Result<RunReport> {
        self.run_invocation(self.start_invocation()).await
    }

    /// Runs the polling loop until the queue is empty or the budget is spent
    ///
    /// # Loop
    ///
    /// 1. Poll for a batch; an empty batch ends the invocation
    /// 2. Run every message through the item pipeline, in order
    /// 3. Delete only the messages whose pipeline succeeded
    /// 4. Stop if the drain mode is single-batch or the budget is exhausted,
    ///    otherwise poll again
    ///
    /// The budget is only checked between batches, so a slow batch may
    /// overrun it.
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - The invocation completed
    /// * `Err(CrawlError)` - The queue or the catalog became unreachable
    pub async fn run_invocation(&self, mut ctx: InvocationContext) -> Result<RunReport> {
        tracing::info!(
            "Starting invocation (budget {}s, drain mode {})",
            self.settings.time_budget.as_secs(),
            self.settings.drain_mode
        );

        let status = match self.drain(&mut ctx).await {
            Ok(status) => status,
            Err(e) => {
                tracing::error!("Invocation aborted: {}", e);
                ctx.stats.log_summary(ctx.budget.elapsed());
                return Err(e);
            }
        };

        tracing::info!("Invocation complete: {}", status);
        ctx.stats.log_summary(ctx.budget.elapsed());

        Ok(RunReport {
            status,
            stats: ctx.stats,
        })
    }

    async fn drain(&self, ctx: &mut InvocationContext) -> Result<RunStatus> {
        let mut state = OrchestratorState::Polling;

        loop {
            let batch = self
                .queue
                .receive(self.settings.max_messages, self.settings.wait_seconds)
                .await?;

            if batch.is_empty() {
                advance(&mut state, OrchestratorState::Done)?;
                return Ok(RunStatus::NoMoreWork);
            }

            advance(&mut state, OrchestratorState::ProcessingBatch)?;
            ctx.stats.record_batch(batch.len());
            tracing::info!("Processing batch of {} messages", batch.len());

            for message in &batch {
                if message.is_blank() {
                    // Nothing to look up; acknowledge so it stops coming back.
                    tracing::warn!("Discarding message with an empty body");
                    ctx.stats.record_blank();
                    let acknowledged = self.queue.delete(message).await;
                    ctx.stats.record_delete(acknowledged);
                    continue;
                }

                let outcome = self.process_item(message, ctx).await?;
                ctx.stats.record_outcome(&outcome);

                if outcome.is_success() {
                    let acknowledged = self.queue.delete(message).await;
                    ctx.stats.record_delete(acknowledged);
                    continue;
                }

                match &outcome {
                    ItemOutcome::Retry(reason) => {
                        tracing::debug!("Leaving {} in queue: {}", message.identifier, reason);
                    }
                    ItemOutcome::Failure(kind) => {
                        tracing::warn!("Leaving {} in queue: {}", message.identifier, kind);
                    }
                    ItemOutcome::Success(_) => {}
                }
            }

            if self.settings.drain_mode == DrainMode::SingleBatch {
                advance(&mut state, OrchestratorState::Done)?;
                return Ok(RunStatus::SingleBatchComplete);
            }

            if ctx.budget.is_exhausted() {
                advance(&mut state, OrchestratorState::Done)?;
                return Ok(RunStatus::BudgetExhausted);
            }

            advance(&mut state, OrchestratorState::Polling)?;
        }
    }

    /// Runs one message through fetch, import and expansion
    ///
    /// Per-item problems come back as `Retry` or `Failure`; only errors that
    /// must abort the invocation are returned as `Err`.
    pub async fn process_item(
        &self,
        message: &QueueMessage,
        ctx: &InvocationContext,
    ) -> Result<ItemOutcome> {
        let identifier = message.identifier.as_str();
        tracing::debug!("Processing {}", identifier);

        let record = match self.lookup.fetch(identifier).await {
            Ok(LookupResult::Valid(record)) => record,
            Ok(LookupResult::Invalid(reason)) => {
                return Ok(ItemOutcome::Retry(RetryReason::InvalidResponse(reason)))
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => return Ok(ItemOutcome::Failure(FailureKind::Fetch(e.to_string()))),
        };

        let product = match self.importer.import(&record).await {
            Ok(ImportOutcome::Imported(product)) => product,
            Ok(ImportOutcome::NoOp) => return Ok(ItemOutcome::Retry(RetryReason::ImportNoOp)),
            Err(e) if e.is_unavailable() => return Err(e.into()),
            Err(e) => {
                return Ok(ItemOutcome::Failure(FailureKind::Persistence(
                    e.to_string(),
                )))
            }
        };

        let expansion = expand(&product, &self.queue, &ctx.seen).await;

        Ok(ItemOutcome::Success(ProcessedItem { product, expansion }))
    }
}

/// Moves the loop to `next`, rejecting transitions the state machine forbids
fn advance(state: &mut OrchestratorState, next: OrchestratorState) -> Result<()> {
    if !state.can_transition_to(next) {
        return Err(CrawlError::InvalidTransition {
            from: *state,
            to: next,
        });
    }
    tracing::trace!("Orchestrator {} -> {}", state, next);
    *state = next;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::InvalidReason;
    use crate::queue::{QueueError, QueueTransport};
    use crate::storage::{LookupRecord, StorageError, StorageResult};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct NullTransport {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl QueueTransport for NullTransport {
        async fn receive(
            &self,
            _: u32,
            _: u32,
        ) -> std::result::Result<Vec<QueueMessage>, QueueError> {
            Ok(Vec::new())
        }

        async fn delete(&self, _: &str) -> std::result::Result<(), QueueError> {
            Ok(())
        }

        async fn send(&self, body: &str) -> std::result::Result<(), QueueError> {
            self.sent.lock().unwrap().push(body.to_string());
            Ok(())
        }
    }

    struct MapLookup {
        responses: HashMap<String, LookupResult>,
    }

    #[async_trait]
    impl Lookup for MapLookup {
        async fn fetch(&self, identifier: &str) -> Result<LookupResult> {
            self.responses
                .get(identifier)
                .cloned()
                .ok_or_else(|| CrawlError::FetchStatus {
                    identifier: identifier.to_string(),
                    status: 503,
                })
        }
    }

    struct UnreachableStore;

    #[async_trait]
    impl CatalogStore for UnreachableStore {
        async fn count_by_identifier(&self, _: &str) -> StorageResult<u64> {
            Err(StorageError::Unavailable("disk gone".to_string()))
        }

        async fn upsert_from_record(
            &self,
            _: &LookupRecord,
        ) -> StorageResult<Option<crate::storage::CatalogProduct>> {
            Err(StorageError::Unavailable("disk gone".to_string()))
        }

        async fn get_product(
            &self,
            _: &str,
        ) -> StorageResult<Option<crate::storage::CatalogProduct>> {
            Err(StorageError::Unavailable("disk gone".to_string()))
        }

        async fn count_products(&self) -> StorageResult<u64> {
            Err(StorageError::Unavailable("disk gone".to_string()))
        }
    }

    fn settings() -> RunSettings {
        RunSettings {
            max_messages: 10,
            wait_seconds: 0,
            time_budget: Duration::from_secs(60),
            drain_mode: DrainMode::Continuous,
        }
    }

    fn coordinator(
        responses: Vec<(&str, LookupResult)>,
        store: Arc<dyn CatalogStore>,
    ) -> (Coordinator, Arc<NullTransport>) {
        let transport = Arc::new(NullTransport::default());
        let lookup = MapLookup {
            responses: responses
                .into_iter()
                .map(|(id, result)| (id.to_string(), result))
                .collect(),
        };
        let coordinator = Coordinator::new(
            QueueClient::new(transport.clone(), store.clone()),
            Arc::new(lookup),
            Importer::new(store),
            settings(),
        );
        (coordinator, transport)
    }

    fn valid(item: serde_json::Value) -> LookupResult {
        LookupResult::Valid(LookupRecord::new(item))
    }

    #[test]
    fn test_every_status_reports_done() {
        for status in [
            RunStatus::NoMoreWork,
            RunStatus::BudgetExhausted,
            RunStatus::SingleBatchComplete,
        ] {
            assert_eq!(status.terminal_status(), "Done");
        }
        assert_eq!(RunStatus::NoMoreWork.to_string(), "no more work");
    }

    #[test]
    fn test_advance_rejects_leaving_done() {
        let mut state = OrchestratorState::Done;
        let result = advance(&mut state, OrchestratorState::Polling);
        assert!(matches!(result, Err(CrawlError::InvalidTransition { .. })));
        assert_eq!(state, OrchestratorState::Done);
    }

    #[test]
    fn test_advance_follows_loop() {
        let mut state = OrchestratorState::Polling;
        advance(&mut state, OrchestratorState::ProcessingBatch).unwrap();
        advance(&mut state, OrchestratorState::Polling).unwrap();
        advance(&mut state, OrchestratorState::Done).unwrap();
        assert!(state.is_terminal());
    }

    #[tokio::test]
    async fn test_process_item_success_expands_relations() {
        let store = Arc::new(SqliteCatalog::new_in_memory().unwrap());
        let (coordinator, transport) = coordinator(
            vec![(
                "B000123",
                valid(json!({
                    "ASIN": "B000123",
                    "SimilarProducts": { "SimilarProduct": { "ASIN": "B000200" } }
                })),
            )],
            store,
        );
        let ctx = coordinator.start_invocation();

        let outcome = coordinator
            .process_item(&QueueMessage::new("B000123", "h1"), &ctx)
            .await
            .unwrap();

        match outcome {
            ItemOutcome::Success(item) => {
                assert_eq!(item.product.similar, vec!["B000200"]);
                assert_eq!(item.expansion.enqueued, 1);
            }
            other => panic!("expected success, got {:?}", other),
        }
        assert_eq!(*transport.sent.lock().unwrap(), vec!["B000200"]);
    }

    #[tokio::test]
    async fn test_process_item_invalid_is_retry() {
        let store = Arc::new(SqliteCatalog::new_in_memory().unwrap());
        let (coordinator, _) = coordinator(
            vec![(
                "B000123",
                LookupResult::Invalid(InvalidReason::NotValid("False".to_string())),
            )],
            store.clone(),
        );
        let ctx = coordinator.start_invocation();

        let outcome = coordinator
            .process_item(&QueueMessage::new("B000123", "h1"), &ctx)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            ItemOutcome::Retry(RetryReason::InvalidResponse(_))
        ));
        assert_eq!(store.count_products().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_process_item_fetch_error_is_absorbed() {
        let store = Arc::new(SqliteCatalog::new_in_memory().unwrap());
        let (coordinator, _) = coordinator(Vec::new(), store);
        let ctx = coordinator.start_invocation();

        let outcome = coordinator
            .process_item(&QueueMessage::new("B000999", "h1"), &ctx)
            .await
            .unwrap();

        assert!(matches!(outcome, ItemOutcome::Failure(FailureKind::Fetch(_))));
    }

    #[tokio::test]
    async fn test_process_item_record_without_identifier_is_retry() {
        let store = Arc::new(SqliteCatalog::new_in_memory().unwrap());
        let (coordinator, _) = coordinator(vec![("B000123", valid(json!({})))], store);
        let ctx = coordinator.start_invocation();

        let outcome = coordinator
            .process_item(&QueueMessage::new("B000123", "h1"), &ctx)
            .await
            .unwrap();

        assert_eq!(outcome, ItemOutcome::Retry(RetryReason::ImportNoOp));
    }

    #[tokio::test]
    async fn test_process_item_unreachable_store_aborts() {
        let (coordinator, _) = coordinator(
            vec![("B000123", valid(json!({ "ASIN": "B000123" })))],
            Arc::new(UnreachableStore),
        );
        let ctx = coordinator.start_invocation();

        let result = coordinator
            .process_item(&QueueMessage::new("B000123", "h1"), &ctx)
            .await;

        match result {
            Err(e) => assert!(e.is_fatal()),
            Ok(outcome) => panic!("expected an error, got {:?}", outcome),
        }
    }

    #[tokio::test]
    async fn test_seed_skips_known_identifiers() {
        let store = Arc::new(SqliteCatalog::new_in_memory().unwrap());
        store
            .upsert_from_record(&LookupRecord::new(json!({ "ASIN": "B000123" })))
            .await
            .unwrap();
        let (coordinator, transport) = coordinator(Vec::new(), store);
        let ctx = coordinator.start_invocation();

        let sent = coordinator
            .seed(&["B000123".to_string(), "B000124".to_string()], &ctx)
            .await
            .unwrap();

        assert_eq!(sent, 1);
        assert_eq!(*transport.sent.lock().unwrap(), vec!["B000124"]);
    }
}
