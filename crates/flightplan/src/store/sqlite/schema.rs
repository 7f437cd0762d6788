//! `SQLite` schema definitions for the document store.
//!
//! Documents are stored as JSON text, one row per document, tagged with the
//! name of the collection they belong to.

/// SQL statement to create the documents table.
pub const CREATE_DOCUMENTS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    collection TEXT NOT NULL,
    body TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
)
";

/// SQL statement to create an index on collection for scans.
pub const CREATE_COLLECTION_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection, id)
";

/// SQL statement to index flight plan identifiers inside document bodies.
pub const CREATE_FLIGHT_PLAN_ID_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_documents_flight_plan_id
ON documents(collection, json_extract(body, '$.flight_plan_id'))
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// Base schema creation statements in order.
///
/// Later additions live in the migrations.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_DOCUMENTS_TABLE,
    CREATE_COLLECTION_INDEX,
    CREATE_METADATA_TABLE,
];
