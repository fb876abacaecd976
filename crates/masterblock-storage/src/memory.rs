//! In-memory implementation of the storage traits.
//!
//! [`InMemoryStore`] is a first-class backend for tests, previews, and
//! anywhere persistence isn't needed. It keeps everything in HashMaps with
//! the same semantics as the SQLite backend, including identifier
//! allocation from a single monotonically increasing counter.

use std::collections::{BTreeMap, HashMap};

use masterblock_core::{DocumentId, SectionId};

use crate::error::StorageError;
use crate::traits::{
    DocumentMetaStore, DocumentStore, GlobalStore, LayoutStore, RecordStore, RevisionContext,
};

/// Data stored for a single document.
#[derive(Debug, Clone, Default)]
struct StoredDocument {
    /// Set for revision snapshots.
    revision_of: Option<DocumentId>,
    layout: Option<Vec<SectionId>>,
    meta: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
struct StoredRecord {
    document: DocumentId,
    body: String,
}

/// In-memory implementation of every storage trait.
#[derive(Debug)]
pub struct InMemoryStore {
    documents: HashMap<DocumentId, StoredDocument>,
    records: BTreeMap<SectionId, StoredRecord>,
    globals: BTreeMap<String, String>,
    next_document_id: i64,
    next_sid: i64,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        InMemoryStore {
            documents: HashMap::new(),
            records: BTreeMap::new(),
            globals: BTreeMap::new(),
            next_document_id: 1,
            next_sid: 1,
        }
    }

    fn get_document(&self, id: DocumentId) -> Result<&StoredDocument, StorageError> {
        self.documents
            .get(&id)
            .ok_or(StorageError::DocumentNotFound(id))
    }

    fn get_document_mut(&mut self, id: DocumentId) -> Result<&mut StoredDocument, StorageError> {
        self.documents
            .get_mut(&id)
            .ok_or(StorageError::DocumentNotFound(id))
    }

    fn insert_document(&mut self, revision_of: Option<DocumentId>) -> DocumentId {
        let id = DocumentId(self.next_document_id);
        self.next_document_id += 1;
        self.documents.insert(
            id,
            StoredDocument {
                revision_of,
                ..StoredDocument::default()
            },
        );
        id
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for InMemoryStore {
    fn create(&mut self, document: DocumentId) -> Result<SectionId, StorageError> {
        self.get_document(document)?;
        let sid = SectionId(self.next_sid);
        self.next_sid += 1;
        self.records.insert(
            sid,
            StoredRecord {
                document,
                body: String::new(),
            },
        );
        Ok(sid)
    }

    fn put(&mut self, sid: SectionId, blob: &str) -> Result<(), StorageError> {
        let record = self
            .records
            .get_mut(&sid)
            .ok_or(StorageError::RecordNotFound(sid))?;
        record.body = blob.to_string();
        Ok(())
    }

    fn get(&self, sid: SectionId) -> Result<Option<String>, StorageError> {
        Ok(self.records.get(&sid).map(|r| r.body.clone()))
    }

    fn document_of(&self, sid: SectionId) -> Result<Option<DocumentId>, StorageError> {
        Ok(self.records.get(&sid).map(|r| r.document))
    }

    fn delete(&mut self, sid: SectionId) -> Result<bool, StorageError> {
        Ok(self.records.remove(&sid).is_some())
    }

    fn records_for(&self, document: DocumentId) -> Result<Vec<SectionId>, StorageError> {
        Ok(self
            .records
            .iter()
            .filter(|(_, r)| r.document == document)
            .map(|(&sid, _)| sid)
            .collect())
    }
}

impl GlobalStore for InMemoryStore {
    fn put_global(&mut self, key: &str, blob: &str) -> Result<(), StorageError> {
        self.globals.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn get_global(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.globals.get(key).cloned())
    }

    fn delete_global(&mut self, key: &str) -> Result<bool, StorageError> {
        Ok(self.globals.remove(key).is_some())
    }

    fn global_keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self.globals.keys().cloned().collect())
    }
}

impl LayoutStore for InMemoryStore {
    fn put_layout(&mut self, document: DocumentId, layout: &[SectionId]) -> Result<(), StorageError> {
        self.get_document_mut(document)?.layout = Some(layout.to_vec());
        Ok(())
    }

    fn get_layout(&self, document: DocumentId) -> Result<Option<Vec<SectionId>>, StorageError> {
        Ok(self
            .documents
            .get(&document)
            .and_then(|d| d.layout.clone()))
    }
}

impl DocumentStore for InMemoryStore {
    fn create_document(&mut self) -> Result<DocumentId, StorageError> {
        Ok(self.insert_document(None))
    }

    fn create_revision(&mut self, of: DocumentId) -> Result<DocumentId, StorageError> {
        self.get_document(of)?;
        Ok(self.insert_document(Some(of)))
    }
}

impl RevisionContext for InMemoryStore {
    fn is_snapshot(&self, document: DocumentId) -> Result<bool, StorageError> {
        Ok(self.get_document(document)?.revision_of.is_some())
    }
}

impl DocumentMetaStore for InMemoryStore {
    fn add_meta(&mut self, document: DocumentId, key: &str, value: &str) -> Result<(), StorageError> {
        self.get_document_mut(document)?
            .meta
            .push((key.to_string(), value.to_string()));
        Ok(())
    }

    fn meta_keys(&self, document: DocumentId) -> Result<Vec<String>, StorageError> {
        Ok(self
            .get_document(document)?
            .meta
            .iter()
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn delete_meta(&mut self, document: DocumentId, key: &str) -> Result<usize, StorageError> {
        let meta = &mut self.get_document_mut(document)?.meta;
        let before = meta.len();
        meta.retain(|(k, _)| k != key);
        Ok(before - meta.len())
    }

    fn delete_meta_prefixed(&mut self, document: DocumentId, prefix: &str) -> Result<usize, StorageError> {
        let meta = &mut self.get_document_mut(document)?.meta;
        let before = meta.len();
        meta.retain(|(k, _)| !k.starts_with(prefix));
        Ok(before - meta.len())
    }
}
