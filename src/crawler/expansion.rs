use crate::queue::QueueClient;
use crate::state::SeenSet;
use crate::storage::CatalogProduct;
use futures::future::join_all;

/// What an expansion did with a product's related identifiers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionReport {
    /// Identifiers sent to the queue
    pub enqueued: usize,

    /// Identifiers skipped because they were already known
    pub skipped: usize,

    /// Sends that failed; these are dropped, not retried
    pub errors: usize,
}

impl ExpansionReport {
    pub fn total(&self) -> usize {
        self.enqueued + self.skipped + self.errors
    }
}

/// Enqueues the related identifiers of `product` that are not yet known
///
/// Every identifier in the similar-items and accessory lists goes through
/// `send_if_absent`. The sends run concurrently and are joined before
/// returning. A failed send never affects its siblings or the item.
pub async fn expand(
    product: &CatalogProduct,
    queue: &QueueClient,
    seen: &SeenSet,
) -> ExpansionReport {
    let related: Vec<&str> = product.related_identifiers().collect();
    if related.is_empty() {
        return ExpansionReport::default();
    }

    let sends = related
        .iter()
        .map(|identifier| queue.send_if_absent(identifier, seen));
    let results = join_all(sends).await;

    let mut report = ExpansionReport::default();
    for (identifier, result) in related.iter().zip(results) {
        match result {
            Ok(true) => report.enqueued += 1,
            Ok(false) => report.skipped += 1,
            Err(e) => {
                tracing::debug!("Dropping send of {}: {}", identifier, e);
                report.errors += 1;
            }
        }
    }

    tracing::debug!(
        "Expanded {}: {} enqueued, {} known, {} failed",
        product.identifier,
        report.enqueued,
        report.skipped,
        report.errors
    );
    report
}
