//! Storage module for the product catalog
//!
//! This module handles everything on the persistence side of the pipeline:
//! - The `CatalogStore` seam (count-by-identifier, upsert-from-record)
//! - SQLite schema and the SQLite-backed store
//! - Normalizing a lookup record into a `CatalogProduct`
//! - The importer that drives the upsert

mod import;
mod schema;
mod sqlite;
mod traits;

pub use import::{ImportOutcome, Importer};
pub use sqlite::SqliteCatalog;
pub use traits::{CatalogStore, StorageError, StorageResult};

use serde_json::Value;

/// A validated item payload returned by the lookup API
///
/// This is the `Item` element of a lookup response, converted to a
/// structured value with single-element arrays collapsed.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupRecord {
    item: Value,
}

impl LookupRecord {
    pub fn new(item: Value) -> Self {
        Self { item }
    }

    pub fn as_value(&self) -> &Value {
        &self.item
    }

    /// The record's catalog identifier, if present
    pub fn identifier(&self) -> Option<&str> {
        text_at(&self.item, &["ASIN"]).filter(|id| !id.trim().is_empty())
    }
}

/// Which relation list an identifier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    Similar,
    Accessory,
}

impl RelationKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Similar => "similar",
            Self::Accessory => "accessory",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "similar" => Some(Self::Similar),
            "accessory" => Some(Self::Accessory),
            _ => None,
        }
    }
}

/// A normalized product as persisted in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogProduct {
    pub identifier: String,
    pub title: Option<String>,
    pub brand: Option<String>,
    pub detail_url: Option<String>,
    pub sales_rank: Option<i64>,
    /// Identifiers of similar items, in response order
    pub similar: Vec<String>,
    /// Identifiers of accessories, in response order
    pub accessories: Vec<String>,
}

impl CatalogProduct {
    /// A product with only an identifier and no relations
    pub fn bare(identifier: &str) -> Self {
        Self {
            identifier: identifier.to_string(),
            title: None,
            brand: None,
            detail_url: None,
            sales_rank: None,
            similar: Vec::new(),
            accessories: Vec::new(),
        }
    }

    /// Normalizes a lookup record
    ///
    /// Returns None when the record carries no identifier. Missing relation
    /// lists become empty.
    pub fn from_record(record: &LookupRecord) -> Option<Self> {
        let item = record.as_value();
        let identifier = record.identifier()?.to_string();

        Some(Self {
            identifier,
            title: text_at(item, &["ItemAttributes", "Title"]).map(str::to_string),
            brand: text_at(item, &["ItemAttributes", "Brand"]).map(str::to_string),
            detail_url: text_at(item, &["DetailPageURL"]).map(str::to_string),
            sales_rank: text_at(item, &["SalesRank"]).and_then(|s| s.trim().parse().ok()),
            similar: relation_identifiers(item, "SimilarProducts", "SimilarProduct"),
            accessories: relation_identifiers(item, "Accessories", "Accessory"),
        })
    }

    /// Relation list for the given kind
    pub fn relations(&self, kind: RelationKind) -> &[String] {
        match kind {
            RelationKind::Similar => &self.similar,
            RelationKind::Accessory => &self.accessories,
        }
    }

    /// All related identifiers, similar items first
    pub fn related_identifiers(&self) -> impl Iterator<Item = &str> {
        self.similar
            .iter()
            .chain(self.accessories.iter())
            .map(String::as_str)
    }
}

/// Follows a path of object keys and returns the string at the end
fn text_at<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |current, key| current.get(*key))
        .and_then(Value::as_str)
}

/// Collects `container.entry[*].ASIN`, where `entry` is either a single
/// object or an array of them
fn relation_identifiers(item: &Value, container: &str, entry: &str) -> Vec<String> {
    let entries = match item.get(container).and_then(|c| c.get(entry)) {
        Some(Value::Array(entries)) => entries.iter().collect(),
        Some(single) => vec![single],
        None => Vec::new(),
    };

    entries
        .into_iter()
        .filter_map(|e| e.get("ASIN").and_then(Value::as_str))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}
