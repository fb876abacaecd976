//! Storage contracts and backends for sectioned document layouts.
//!
//! The layout service sits on top of a handful of small stores, each defined
//! as a trait in [`traits`]:
//! - **Record store**: opaque section blobs addressed by a document-scoped
//!   numeric [`SectionId`](masterblock_core::SectionId).
//! - **Global store**: master-block blobs addressed by a process-wide key.
//! - **Layout store**: the ordered sid list of each document.
//! - **Document store / revision context**: documents and their snapshots.
//! - **Document meta store**: loose per-document keys, purged on save.
//!
//! [`InMemoryStore`] and [`SqliteStore`] implement all of them with
//! identical semantics.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`traits`]: store trait definitions and the [`LayoutBackend`] umbrella
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: SQL migrations and connection setup
//! - [`sqlite`]: SqliteStore implementation

pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    DocumentMetaStore, DocumentStore, GlobalStore, LayoutBackend, LayoutStore, RecordStore,
    RevisionContext,
};
