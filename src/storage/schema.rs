//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the catalog database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Catalog products, keyed by identifier
CREATE TABLE IF NOT EXISTS products (
    asin TEXT PRIMARY KEY,
    title TEXT,
    brand TEXT,
    detail_url TEXT,
    sales_rank INTEGER,
    raw_record TEXT NOT NULL,
    first_seen_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Relation lists, replaced wholesale on every upsert
CREATE TABLE IF NOT EXISTS product_relations (
    asin TEXT NOT NULL REFERENCES products(asin) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    related_asin TEXT NOT NULL,
    position INTEGER NOT NULL,
    PRIMARY KEY (asin, kind, related_asin)
);

CREATE INDEX IF NOT EXISTS idx_relations_related ON product_relations(related_asin);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
