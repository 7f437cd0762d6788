//! `SQLite`-backed document store.
//!
//! Each document is one row of JSON text. Equality filters are evaluated with
//! `json_extract`, so keyed lookups on `flight_plan_id` use the expression
//! index created by the migrations.

pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, info};

use super::{apply_set, Document, DocumentStore, Filter, InsertAck, UpdateOutcome, STORAGE_ID_KEY};
use crate::error::{Error, Result};

/// Document store persisted in a `SQLite` database file.
///
/// The connection is opened once and shared behind a mutex. Every trait
/// method is one short critical section run on the blocking thread pool.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open or create a document database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// and brings the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening document store at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        // WAL mode lets readers proceed while a write is in flight
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Document store opened at {}", path.display());
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store, mainly for tests.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a closure against the connection on tokio's blocking pool.
    ///
    /// `SQLite` calls block, so they never run on an async worker thread.
    async fn run<T, F>(&self, operation: &'static str, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|_| Error::internal("document store connection lock poisoned"))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| Error::internal(format!("{operation} task failed: {e}")))?
    }

    /// Build the `WHERE` clause and parameters for a filter.
    ///
    /// `?1` is always the collection name.
    fn where_clause(collection: &str, filter: &Filter) -> Result<(String, Vec<SqlValue>)> {
        let mut params = vec![SqlValue::Text(collection.to_string())];
        let clause = match filter {
            Filter::All => "collection = ?1".to_string(),
            Filter::Eq { field, value } => {
                if field.is_empty()
                    || !field
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '_')
                {
                    return Err(Error::internal(format!(
                        "unsupported filter attribute '{field}'"
                    )));
                }
                params.push(Self::sql_value(value)?);
                format!("collection = ?1 AND json_extract(body, '$.{field}') = ?2")
            }
        };
        Ok((clause, params))
    }

    /// Convert a JSON scalar to the value `json_extract` would produce for it.
    fn sql_value(value: &Value) -> Result<SqlValue> {
        match value {
            Value::String(s) => Ok(SqlValue::Text(s.clone())),
            Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
            Value::Number(n) => n
                .as_i64()
                .map(SqlValue::Integer)
                .or_else(|| n.as_f64().map(SqlValue::Real))
                .ok_or_else(|| Error::internal(format!("unsupported filter number {n}"))),
            Value::Null | Value::Array(_) | Value::Object(_) => Err(Error::internal(format!(
                "unsupported filter value {value}"
            ))),
        }
    }

    /// Parse a stored row into a document carrying its storage id.
    fn row_to_document(id: i64, body: &str) -> Result<Document> {
        let mut document: Document = serde_json::from_str(body)?;
        document.insert(STORAGE_ID_KEY.to_string(), Value::String(id.to_string()));
        Ok(document)
    }
}

#[async_trait::async_trait]
impl DocumentStore for SqliteStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let (clause, params) = Self::where_clause(collection, filter)?;
        self.run("find", move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT id, body FROM documents WHERE {clause} ORDER BY id"
            ))?;
            let rows = stmt
                .query_map(params_from_iter(params), |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.iter()
                .map(|(id, body)| Self::row_to_document(*id, body))
                .collect()
        })
        .await
    }

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        let (clause, params) = Self::where_clause(collection, filter)?;
        self.run("find_one", move |conn| {
            let row = conn
                .query_row(
                    &format!("SELECT id, body FROM documents WHERE {clause} ORDER BY id LIMIT 1"),
                    params_from_iter(params),
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?;

            row.map(|(id, body)| Self::row_to_document(id, &body))
                .transpose()
        })
        .await
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<InsertAck> {
        // The row id is the storage id; never persist a caller-supplied one
        document.remove(STORAGE_ID_KEY);
        let body = serde_json::to_string(&document)?;
        let collection = collection.to_string();

        self.run("insert_one", move |conn| {
            conn.execute(
                "INSERT INTO documents (collection, body) VALUES (?1, ?2)",
                params![collection, body],
            )?;

            let id = conn.last_insert_rowid();
            debug!("Inserted document {} into {}", id, collection);
            Ok(InsertAck {
                inserted_id: Some(id.to_string()),
            })
        })
        .await
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        set: Document,
    ) -> Result<UpdateOutcome> {
        let (clause, params) = Self::where_clause(collection, filter)?;
        let collection = collection.to_string();

        self.run("update_one", move |conn| {
            let tx = conn.transaction()?;

            let row = tx
                .query_row(
                    &format!("SELECT id, body FROM documents WHERE {clause} ORDER BY id LIMIT 1"),
                    params_from_iter(params),
                    |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
                )
                .optional()?;

            let Some((id, body)) = row else {
                return Ok(UpdateOutcome::default());
            };

            let mut document: Document = serde_json::from_str(&body)?;
            let changed = apply_set(&mut document, &set);
            if changed {
                tx.execute(
                    "UPDATE documents SET body = ?1, updated_at = datetime('now') WHERE id = ?2",
                    params![serde_json::to_string(&document)?, id],
                )?;
            }
            tx.commit()?;

            debug!(
                "Updated document {} in {} (changed: {})",
                id, collection, changed
            );
            Ok(UpdateOutcome {
                matched_count: 1,
                modified_count: u64::from(changed),
            })
        })
        .await
    }

    async fn delete_one(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let (clause, params) = Self::where_clause(collection, filter)?;
        self.run("delete_one", move |conn| {
            let affected = conn.execute(
                &format!(
                    "DELETE FROM documents WHERE id = (SELECT id FROM documents WHERE {clause} ORDER BY id LIMIT 1)"
                ),
                params_from_iter(params),
            )?;
            Ok(u64::try_from(affected).unwrap_or(u64::MAX))
        })
        .await
    }

    async fn count(&self, collection: &str) -> Result<u64> {
        let collection = collection.to_string();
        self.run("count", move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                [collection],
                |row| row.get(0),
            )?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
        .await
    }
}
