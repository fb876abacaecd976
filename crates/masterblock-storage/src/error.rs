//! Storage error types for masterblock-storage.
//!
//! [`StorageError`] covers all anticipated failure modes in the storage layer:
//! database and migration failures, serialization, and lookups of documents
//! or records that do not exist.

use masterblock_core::{DocumentId, SectionId};
use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An SQLite call failed.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A document with the given ID was not found.
    #[error("document not found: {0}")]
    DocumentNotFound(DocumentId),

    /// A section record with the given sid was not found.
    #[error("section record not found: {0}")]
    RecordNotFound(SectionId),

    /// A data integrity violation was detected.
    #[error("integrity error: {reason}")]
    IntegrityError { reason: String },
}
