//! In-process document store.
//!
//! Keeps collections in a mutex-guarded map. Useful for tests and for running
//! the CLI without a database file.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use tracing::debug;

use super::{apply_set, Document, DocumentStore, Filter, InsertAck, UpdateOutcome, STORAGE_ID_KEY};
use crate::error::{Error, Result};

type Collections = HashMap<String, Vec<Document>>;

/// A document store that lives in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: Mutex<Collections>,
    next_id: AtomicU64,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>> {
        self.collections
            .lock()
            .map_err(|_| Error::internal("memory store lock poisoned"))
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let collections = self.lock()?;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<InsertAck> {
        let id = (self.next_id.fetch_add(1, Ordering::SeqCst) + 1).to_string();
        document.insert(STORAGE_ID_KEY.to_string(), Value::String(id.clone()));

        self.lock()?
            .entry(collection.to_string())
            .or_default()
            .push(document);

        debug!("Inserted document {} into {}", id, collection);
        Ok(InsertAck {
            inserted_id: Some(id),
        })
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<UpdateOutcome> {
        let mut collections = self.lock()?;
        let target = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|doc| filter.matches(doc)));

        Ok(match target {
            Some(document) => UpdateOutcome {
                matched_count: 1,
                modified_count: u64::from(apply_set(document, &set)),
            },
            None => UpdateOutcome::default(),
        })
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let mut collections = self.lock()?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };

        match docs.iter().position(|doc| filter.matches(doc)) {
            Some(index) => {
                docs.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        let collections = self.lock()?;
        let len = collections.get(collection).map_or(0, Vec::len);
        Ok(u64::try_from(len).unwrap_or(u64::MAX))
    }
}
