//! Error types for the layout service.
//!
//! Store failures keep their [`StorageError`] as the source so callers can
//! still match on the backend cause. Integrity gaps found while reading are
//! not errors; they are reported in [`LayoutRead`](crate::LayoutRead).

use masterblock_core::{CoreError, DocumentId, SectionId};
use masterblock_storage::StorageError;
use thiserror::Error;

/// Errors produced by compose and read.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// The record store could not issue a new sid.
    #[error("could not allocate a section id for document {document}: {source}")]
    IdentityAllocationFailed {
        document: DocumentId,
        #[source]
        source: StorageError,
    },

    /// A write to the record, global or layout store failed.
    #[error("store write failed: {0}")]
    StoreWriteFailed(#[source] StorageError),

    /// A read from one of the stores failed.
    #[error("store read failed: {0}")]
    StoreReadFailed(#[source] StorageError),

    /// A section carries a sid the record store has never issued.
    #[error("unknown section: {sid}")]
    UnknownSection { sid: SectionId },

    /// A section carries a sid owned by another document.
    #[error("section {sid} belongs to document {owner}, not {document}")]
    ForeignSection {
        sid: SectionId,
        owner: DocumentId,
        document: DocumentId,
    },

    /// The same sid appears twice in one layout.
    #[error("section {sid} appears more than once in the layout")]
    DuplicateSection { sid: SectionId },

    /// A section could not be normalized, keyed or encoded.
    #[error("invalid section: {0}")]
    InvalidSection(#[from] CoreError),
}
