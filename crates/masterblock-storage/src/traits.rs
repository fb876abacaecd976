//! The storage contracts the layout service is built on.
//!
//! Each trait covers one primitive. Reads take `&self`, writes take
//! `&mut self`, and every call is a single synchronous operation with no
//! retries; failures come back as [`StorageError`] for the caller to handle.
//!
//! All backends (InMemoryStore, SqliteStore) implement every trait, so they
//! are swappable without changing the layout logic. [`LayoutBackend`] names
//! the full set.

use masterblock_core::{DocumentId, SectionId};

use crate::error::StorageError;

/// Section records addressed by a document-scoped numeric identifier.
pub trait RecordStore {
    /// Allocates a new sid owned by `document`, holding an empty placeholder.
    fn create(&mut self, document: DocumentId) -> Result<SectionId, StorageError>;

    /// Overwrites the blob at an existing sid.
    ///
    /// Never allocates: an unknown sid is [`StorageError::RecordNotFound`].
    fn put(&mut self, sid: SectionId, blob: &str) -> Result<(), StorageError>;

    /// Returns the blob at `sid`, or `None` if no such record exists.
    fn get(&self, sid: SectionId) -> Result<Option<String>, StorageError>;

    /// Returns the document owning `sid`, or `None` if no such record exists.
    fn document_of(&self, sid: SectionId) -> Result<Option<DocumentId>, StorageError>;

    /// Removes a record. Returns whether it existed.
    fn delete(&mut self, sid: SectionId) -> Result<bool, StorageError>;

    /// All sids owned by `document`, ascending.
    fn records_for(&self, document: DocumentId) -> Result<Vec<SectionId>, StorageError>;
}

/// Master blocks addressed by a process-wide string key.
pub trait GlobalStore {
    /// Inserts or replaces the blob under `key`.
    fn put_global(&mut self, key: &str, blob: &str) -> Result<(), StorageError>;

    fn get_global(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Removes the blob under `key`. Returns whether it existed.
    fn delete_global(&mut self, key: &str) -> Result<bool, StorageError>;

    /// All keys, sorted.
    fn global_keys(&self) -> Result<Vec<String>, StorageError>;
}

/// The ordered sid list of each document.
pub trait LayoutStore {
    /// Replaces the document's layout wholesale.
    fn put_layout(&mut self, document: DocumentId, layout: &[SectionId]) -> Result<(), StorageError>;

    /// Returns the document's layout, or `None` if none was ever saved.
    fn get_layout(&self, document: DocumentId) -> Result<Option<Vec<SectionId>>, StorageError>;
}

/// Creation of documents and their snapshots.
pub trait DocumentStore {
    fn create_document(&mut self) -> Result<DocumentId, StorageError>;

    /// Creates a snapshot (revision) of an existing document.
    fn create_revision(&mut self, of: DocumentId) -> Result<DocumentId, StorageError>;
}

/// Tells canonical documents apart from their snapshots.
pub trait RevisionContext {
    /// True when `document` is a revision snapshot rather than a canonical document.
    fn is_snapshot(&self, document: DocumentId) -> Result<bool, StorageError>;
}

/// Loose per-document key/value entries.
pub trait DocumentMetaStore {
    fn add_meta(&mut self, document: DocumentId, key: &str, value: &str) -> Result<(), StorageError>;

    /// All keys on the document, in insertion order, duplicates included.
    fn meta_keys(&self, document: DocumentId) -> Result<Vec<String>, StorageError>;

    /// Deletes every entry named `key`. Returns the number removed.
    fn delete_meta(&mut self, document: DocumentId, key: &str) -> Result<usize, StorageError>;

    /// Deletes every entry whose key starts with `prefix`. Returns the number removed.
    fn delete_meta_prefixed(&mut self, document: DocumentId, prefix: &str) -> Result<usize, StorageError>;
}

/// Everything the layout service needs from a backend.
pub trait LayoutBackend:
    RecordStore + GlobalStore + LayoutStore + DocumentStore + RevisionContext + DocumentMetaStore
{
}

impl<T> LayoutBackend for T where
    T: RecordStore + GlobalStore + LayoutStore + DocumentStore + RevisionContext + DocumentMetaStore
{
}
