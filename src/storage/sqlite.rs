//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the CatalogStore trait.

use crate::storage::schema::initialize_schema;
use crate::storage::traits::{CatalogStore, StorageError, StorageResult};
use crate::storage::{CatalogProduct, LookupRecord, RelationKind};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite catalog backend
pub struct SqliteCatalog {
    conn: Mutex<Connection>,
}

impl SqliteCatalog {
    /// Opens (or creates) a catalog database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteCatalog)` - Successfully opened/created database
    /// * `Err(StorageError::Unavailable)` - The database could not be opened
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path).map_err(|e| {
            StorageError::Unavailable(format!("cannot open {}: {}", path.display(), e))
        })?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory catalog (for tests and dry runs)
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection lock poisoned".to_string()))
    }

    fn write_product(
        conn: &mut Connection,
        product: &CatalogProduct,
        record: &LookupRecord,
    ) -> StorageResult<()> {
        let raw = serde_json::to_string(record.as_value())
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO products
             (asin, title, brand, detail_url, sales_rank, raw_record, first_seen_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
             ON CONFLICT(asin) DO UPDATE SET
                title = excluded.title,
                brand = excluded.brand,
                detail_url = excluded.detail_url,
                sales_rank = excluded.sales_rank,
                raw_record = excluded.raw_record,
                updated_at = excluded.updated_at",
            params![
                product.identifier,
                product.title,
                product.brand,
                product.detail_url,
                product.sales_rank,
                raw,
                now
            ],
        )?;

        tx.execute(
            "DELETE FROM product_relations WHERE asin = ?1",
            params![product.identifier],
        )?;

        for kind in [RelationKind::Similar, RelationKind::Accessory] {
            for (position, related) in product.relations(kind).iter().enumerate() {
                tx.execute(
                    "INSERT OR IGNORE INTO product_relations (asin, kind, related_asin, position)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        product.identifier,
                        kind.to_db_string(),
                        related,
                        position as i64
                    ],
                )?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn read_product(conn: &Connection, identifier: &str) -> StorageResult<Option<CatalogProduct>> {
        let product = conn
            .query_row(
                "SELECT asin, title, brand, detail_url, sales_rank FROM products WHERE asin = ?1",
                params![identifier],
                |row| {
                    Ok(CatalogProduct {
                        identifier: row.get(0)?,
                        title: row.get(1)?,
                        brand: row.get(2)?,
                        detail_url: row.get(3)?,
                        sales_rank: row.get(4)?,
                        similar: Vec::new(),
                        accessories: Vec::new(),
                    })
                },
            )
            .optional()?;

        let Some(mut product) = product else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT kind, related_asin FROM product_relations
             WHERE asin = ?1 ORDER BY kind, position",
        )?;
        let rows = stmt.query_map(params![identifier], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (kind, related) = row?;
            match RelationKind::from_db_string(&kind) {
                Some(RelationKind::Similar) => product.similar.push(related),
                Some(RelationKind::Accessory) => product.accessories.push(related),
                None => {
                    tracing::warn!("Ignoring unknown relation kind '{}' on {}", kind, identifier)
                }
            }
        }

        Ok(Some(product))
    }
}

#[async_trait]
impl CatalogStore for SqliteCatalog {
    async fn count_by_identifier(&self, identifier: &str) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM products WHERE asin = ?1",
            params![identifier],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    async fn upsert_from_record(
        &self,
        record: &LookupRecord,
    ) -> StorageResult<Option<CatalogProduct>> {
        let Some(product) = CatalogProduct::from_record(record) else {
            return Ok(None);
        };

        let mut conn = self.lock()?;
        Self::write_product(&mut conn, &product, record)?;
        tracing::debug!(
            "Upserted {} ({} similar, {} accessories)",
            product.identifier,
            product.similar.len(),
            product.accessories.len()
        );

        Ok(Some(product))
    }

    async fn get_product(&self, identifier: &str) -> StorageResult<Option<CatalogProduct>> {
        let conn = self.lock()?;
        Self::read_product(&conn, identifier)
    }

    async fn count_products(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
