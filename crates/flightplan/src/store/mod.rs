//! Document store abstraction.
//!
//! A document store holds named collections of schema-free JSON documents.
//! The persistence adapter talks to a store only through [`DocumentStore`],
//! so the `SQLite` backend and the in-process backend are interchangeable.

pub mod memory;
pub mod sqlite;

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::config::{Config, StoreBackend};
use crate::error::Result;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// A stored document: attribute name to JSON value.
pub type Document = Map<String, Value>;

/// Attribute holding the storage-level identifier assigned on insert.
pub const STORAGE_ID_KEY: &str = "_id";

/// Selects the documents an operation applies to.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every document in the collection.
    All,
    /// Documents whose attribute equals the given value.
    Eq {
        /// Attribute name.
        field: String,
        /// Value to compare against.
        value: Value,
    },
}

impl Filter {
    /// Equality filter on a single attribute.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Check whether a document satisfies this filter.
    #[must_use]
    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Self::All => true,
            Self::Eq { field, value } => document.get(field) == Some(value),
        }
    }
}

/// Acknowledgement of an insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertAck {
    /// Storage-level identifier of the new document, if the store reported one.
    pub inserted_id: Option<String>,
}

/// Outcome of an update of a single document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOutcome {
    /// Number of documents that matched the filter.
    pub matched_count: u64,
    /// Number of documents whose contents actually changed.
    pub modified_count: u64,
}

/// Overwrite `set`'s attributes on `document`.
///
/// Returns `true` if any stored value changed.
pub(crate) fn apply_set(document: &mut Document, set: &Document) -> bool {
    let mut changed = false;
    for (key, value) in set {
        if document.get(key) != Some(value) {
            document.insert(key.clone(), value.clone());
            changed = true;
        }
    }
    changed
}

/// Operations a document store provides to the persistence adapter.
///
/// Every method is a self-contained round trip. Implementations must be safe
/// to call from concurrent tasks.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Short backend name for logs and status output.
    fn backend_name(&self) -> &'static str;

    /// Return all matching documents in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>>;

    /// Return the first matching document, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        Ok(self.find(collection, filter).await?.into_iter().next())
    }

    /// Insert a document, assigning it a storage-level identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be stored.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<InsertAck>;

    /// Overwrite the attributes in `set` on the first matching document.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried or written.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<UpdateOutcome>;

    /// Remove the first matching document, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64>;

    /// Count the documents in a collection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    async fn count(&self, collection: &str) -> Result<u64>;
}

/// Open the store selected by the configuration.
///
/// The returned handle is meant to be opened once and shared. A
/// [`StoreBackend::Memory`] store lives only as long as this process.
///
/// # Errors
///
/// Returns an error if the `SQLite` database cannot be opened.
pub fn open(config: &Config) -> Result<Arc<dyn DocumentStore>> {
    match config.storage.backend {
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::open(config.database_path())?)),
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn test_filter_all_matches_everything() {
        assert!(Filter::All.matches(&Document::new()));
        assert!(Filter::All.matches(&document(json!({"a": 1}))));
    }

    #[test]
    fn test_filter_eq() {
        let doc = document(json!({"flight_plan_id": "abc", "altitude": 6500}));

        assert!(Filter::eq("flight_plan_id", "abc").matches(&doc));
        assert!(!Filter::eq("flight_plan_id", "xyz").matches(&doc));
        assert!(Filter::eq("altitude", 6500).matches(&doc));
        assert!(!Filter::eq("missing", "abc").matches(&doc));
    }

    #[test]
    fn test_apply_set_reports_changes() {
        let mut doc = document(json!({"route": "DCT", "altitude": 6500}));

        assert!(!apply_set(&mut doc, &document(json!({"route": "DCT"}))));
        assert!(apply_set(&mut doc, &document(json!({"altitude": 8500}))));
        assert_eq!(doc["altitude"], 8500);
        assert!(apply_set(&mut doc, &document(json!({"remarks": null}))));
        assert!(doc.contains_key("remarks"));
    }

    #[test]
    fn test_update_outcome_default() {
        let outcome = UpdateOutcome::default();
        assert_eq!(outcome.matched_count, 0);
        assert_eq!(outcome.modified_count, 0);
    }

    #[test]
    fn test_open_memory_backend() {
        let mut config = Config::default();
        config.storage.backend = StoreBackend::Memory;

        let store = open(&config).unwrap();
        assert_eq!(store.backend_name(), "memory");
    }

    #[test]
    fn test_open_sqlite_backend() {
        let path = std::env::temp_dir().join(format!(
            "flightplan_open_test_{}.db",
            std::process::id()
        ));
        let mut config = Config::default();
        config.storage.database_path = Some(path.clone());

        let store = open(&config).unwrap();
        assert_eq!(store.backend_name(), "sqlite");

        drop(store);
        let _ = std::fs::remove_file(&path);
        let _ = std::fs::remove_file(path.with_extension("db-wal"));
        let _ = std::fs::remove_file(path.with_extension("db-shm"));
    }
}
