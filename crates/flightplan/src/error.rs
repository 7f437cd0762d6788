//! Error types for flightplan.
//!
//! This module defines the error type shared by the entity, mapping, store and
//! adapter layers. Mutating adapter operations never surface these directly;
//! they downgrade store faults to a [`TransactionResult`](crate::TransactionResult).

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for flightplan operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// The document store could not complete a read.
    #[error("document store unavailable during {operation}: {message}")]
    StoreUnavailable {
        /// The adapter operation that was running.
        operation: &'static str,
        /// Description of the underlying fault.
        message: String,
    },

    // === Document Errors ===
    /// A stored document lacks a required attribute.
    #[error("stored document is missing attribute '{field}'")]
    MissingField {
        /// The stored attribute name.
        field: &'static str,
    },

    /// A stored attribute holds a value of the wrong type.
    #[error("stored attribute '{field}' is not a valid {expected}")]
    InvalidField {
        /// The stored attribute name.
        field: &'static str,
        /// The expected stored type.
        expected: &'static str,
    },

    // === Filing Errors ===
    /// A flight plan failed filing validation.
    #[error("invalid flight plan field '{field}': {message}")]
    Validation {
        /// The flight plan field that failed.
        field: &'static str,
        /// Description of the validation failure.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // === Generic Errors ===
    /// An internal error occurred (bug).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A specialized Result type for flightplan operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Create a store-unavailable error for the named adapter operation.
    #[must_use]
    pub fn store_unavailable(operation: &'static str, message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            operation,
            message: message.into(),
        }
    }

    /// Create a filing validation error.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Check if this error came from decoding a stored document.
    #[must_use]
    pub fn is_decode_error(&self) -> bool {
        matches!(self, Self::MissingField { .. } | Self::InvalidField { .. })
    }

    /// Check if this error is a filing validation failure.
    #[must_use]
    pub fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Check if this error means the store could not be reached or queried.
    #[must_use]
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. })
    }
}
