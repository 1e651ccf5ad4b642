use crate::storage::traits::{CatalogStore, StorageResult};
use crate::storage::{CatalogProduct, LookupRecord};
use std::sync::Arc;

/// What an import produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// The record was upserted; the normalized product is returned
    Imported(CatalogProduct),

    /// Nothing to write (the record had no identifier)
    NoOp,
}

/// Upserts validated lookup records into the catalog store
#[derive(Clone)]
pub struct Importer {
    store: Arc<dyn CatalogStore>,
}

impl Importer {
    pub fn new(store: Arc<dyn CatalogStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    /// Imports a record; importing the same record twice is harmless
    pub async fn import(&self, record: &LookupRecord) -> StorageResult<ImportOutcome> {
        match self.store.upsert_from_record(record).await? {
            Some(product) => Ok(ImportOutcome::Imported(product)),
            None => {
                tracing::warn!("Lookup record has no identifier, nothing imported");
                Ok(ImportOutcome::NoOp)
            }
        }
    }
}
