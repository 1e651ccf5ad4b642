//! Storage traits and error types
//!
//! This module defines the catalog store interface consumed by the pipeline
//! and its error types.

use crate::storage::{CatalogProduct, LookupRecord};
use async_trait::async_trait;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Catalog store unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// Returns true if the store as a whole cannot be used
    ///
    /// Anything else is scoped to the record being written.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            Self::Sqlite(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                ErrorCode::CannotOpen
                    | ErrorCode::NotADatabase
                    | ErrorCode::DatabaseCorrupt
                    | ErrorCode::SystemIoFailure
                    | ErrorCode::PermissionDenied
            ),
            _ => false,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for catalog store implementations
///
/// The check (`count_by_identifier`) and the write (`upsert_from_record`)
/// are separate calls with no transaction spanning them. Upserts must be
/// idempotent so racing writers cannot corrupt the catalog.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Number of catalog entries with this identifier (0 or 1)
    async fn count_by_identifier(&self, identifier: &str) -> StorageResult<u64>;

    /// Inserts or updates the product described by `record`
    ///
    /// # Returns
    ///
    /// * `Ok(Some(product))` - The normalized product as stored
    /// * `Ok(None)` - The record has no identifier; nothing was written
    async fn upsert_from_record(&self, record: &LookupRecord)
        -> StorageResult<Option<CatalogProduct>>;

    /// Loads a product and its relation lists
    async fn get_product(&self, identifier: &str) -> StorageResult<Option<CatalogProduct>>;

    /// Total number of products in the catalog
    async fn count_products(&self) -> StorageResult<u64>;
}
