//! SQLite implementation of the storage traits.
//!
//! [`SqliteStore`] persists documents, section records, master blocks and
//! layouts in a SQLite database with WAL mode and automatic schema
//! migrations. Record and master bodies are stored verbatim as TEXT; layouts
//! are stored as a JSON array of sid strings.

use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};

use masterblock_core::{DocumentId, SectionId};

use crate::error::StorageError;
use crate::traits::{
    DocumentMetaStore, DocumentStore, GlobalStore, LayoutStore, RecordStore, RevisionContext,
};

/// SQLite-backed implementation of every storage trait.
///
/// Writes that touch more than one row run inside a transaction.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore { conn })
    }

    fn assert_document_exists(&self, id: DocumentId) -> Result<(), StorageError> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE id = ?1)",
            params![id.0],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::DocumentNotFound(id));
        }
        Ok(())
    }

    fn insert_document(&mut self, revision_of: Option<DocumentId>) -> Result<DocumentId, StorageError> {
        self.conn.execute(
            "INSERT INTO documents (revision_of) VALUES (?1)",
            params![revision_of.map(|d| d.0)],
        )?;
        Ok(DocumentId(self.conn.last_insert_rowid()))
    }
}

impl RecordStore for SqliteStore {
    fn create(&mut self, document: DocumentId) -> Result<SectionId, StorageError> {
        let tx = self.conn.transaction()?;
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM documents WHERE id = ?1)",
            params![document.0],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StorageError::DocumentNotFound(document));
        }
        tx.execute(
            "INSERT INTO section_records (document_id, body) VALUES (?1, '')",
            params![document.0],
        )?;
        let sid = SectionId(tx.last_insert_rowid());
        tx.commit()?;
        Ok(sid)
    }

    fn put(&mut self, sid: SectionId, blob: &str) -> Result<(), StorageError> {
        let updated = self.conn.execute(
            "UPDATE section_records SET body = ?2 WHERE sid = ?1",
            params![sid.0, blob],
        )?;
        if updated == 0 {
            return Err(StorageError::RecordNotFound(sid));
        }
        Ok(())
    }

    fn get(&self, sid: SectionId) -> Result<Option<String>, StorageError> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM section_records WHERE sid = ?1",
                params![sid.0],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    fn document_of(&self, sid: SectionId) -> Result<Option<DocumentId>, StorageError> {
        let document = self
            .conn
            .query_row(
                "SELECT document_id FROM section_records WHERE sid = ?1",
                params![sid.0],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(document.map(DocumentId))
    }

    fn delete(&mut self, sid: SectionId) -> Result<bool, StorageError> {
        let removed = self
            .conn
            .execute("DELETE FROM section_records WHERE sid = ?1", params![sid.0])?;
        Ok(removed > 0)
    }

    fn records_for(&self, document: DocumentId) -> Result<Vec<SectionId>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT sid FROM section_records WHERE document_id = ?1 ORDER BY sid")?;
        let rows = stmt.query_map(params![document.0], |row| row.get::<_, i64>(0))?;
        let mut sids = Vec::new();
        for row in rows {
            sids.push(SectionId(row?));
        }
        Ok(sids)
    }
}

impl GlobalStore for SqliteStore {
    fn put_global(&mut self, key: &str, blob: &str) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO master_blocks (key, body) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET body = excluded.body",
            params![key, blob],
        )?;
        Ok(())
    }

    fn get_global(&self, key: &str) -> Result<Option<String>, StorageError> {
        let body = self
            .conn
            .query_row(
                "SELECT body FROM master_blocks WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(body)
    }

    fn delete_global(&mut self, key: &str) -> Result<bool, StorageError> {
        let removed = self
            .conn
            .execute("DELETE FROM master_blocks WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    fn global_keys(&self) -> Result<Vec<String>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT key FROM master_blocks ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

impl LayoutStore for SqliteStore {
    fn put_layout(&mut self, document: DocumentId, layout: &[SectionId]) -> Result<(), StorageError> {
        self.assert_document_exists(document)?;
        let sids_json = serde_json::to_string(layout)?;
        self.conn.execute(
            "INSERT INTO layouts (document_id, sids_json) VALUES (?1, ?2)
             ON CONFLICT(document_id) DO UPDATE SET sids_json = excluded.sids_json",
            params![document.0, sids_json],
        )?;
        Ok(())
    }

    fn get_layout(&self, document: DocumentId) -> Result<Option<Vec<SectionId>>, StorageError> {
        let sids_json: Option<String> = self
            .conn
            .query_row(
                "SELECT sids_json FROM layouts WHERE document_id = ?1",
                params![document.0],
                |row| row.get(0),
            )
            .optional()?;
        let Some(json) = sids_json else {
            return Ok(None);
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| StorageError::IntegrityError {
                reason: format!("layout of document {document} is malformed: {e}"),
            })
    }
}

impl DocumentStore for SqliteStore {
    fn create_document(&mut self) -> Result<DocumentId, StorageError> {
        self.insert_document(None)
    }

    fn create_revision(&mut self, of: DocumentId) -> Result<DocumentId, StorageError> {
        self.assert_document_exists(of)?;
        self.insert_document(Some(of))
    }
}

impl RevisionContext for SqliteStore {
    fn is_snapshot(&self, document: DocumentId) -> Result<bool, StorageError> {
        let revision_of: Option<Option<i64>> = self
            .conn
            .query_row(
                "SELECT revision_of FROM documents WHERE id = ?1",
                params![document.0],
                |row| row.get(0),
            )
            .optional()?;
        match revision_of {
            Some(parent) => Ok(parent.is_some()),
            None => Err(StorageError::DocumentNotFound(document)),
        }
    }
}

impl DocumentMetaStore for SqliteStore {
    fn add_meta(&mut self, document: DocumentId, key: &str, value: &str) -> Result<(), StorageError> {
        self.assert_document_exists(document)?;
        self.conn.execute(
            "INSERT INTO document_meta (document_id, meta_key, meta_value) VALUES (?1, ?2, ?3)",
            params![document.0, key, value],
        )?;
        Ok(())
    }

    fn meta_keys(&self, document: DocumentId) -> Result<Vec<String>, StorageError> {
        self.assert_document_exists(document)?;
        let mut stmt = self
            .conn
            .prepare_cached("SELECT meta_key FROM document_meta WHERE document_id = ?1 ORDER BY id")?;
        let keys = stmt
            .query_map(params![document.0], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }

    fn delete_meta(&mut self, document: DocumentId, key: &str) -> Result<usize, StorageError> {
        self.assert_document_exists(document)?;
        let removed = self.conn.execute(
            "DELETE FROM document_meta WHERE document_id = ?1 AND meta_key = ?2",
            params![document.0, key],
        )?;
        Ok(removed)
    }

    fn delete_meta_prefixed(&mut self, document: DocumentId, prefix: &str) -> Result<usize, StorageError> {
        self.assert_document_exists(document)?;
        // substr() instead of LIKE so '%' and '_' in the prefix stay literal.
        let removed = self.conn.execute(
            "DELETE FROM document_meta
             WHERE document_id = ?1 AND substr(meta_key, 1, length(?2)) = ?2",
            params![document.0, prefix],
        )?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_document() -> (SqliteStore, DocumentId) {
        let mut store = SqliteStore::in_memory().unwrap();
        let doc = store.create_document().unwrap();
        (store, doc)
    }

    #[test]
    fn create_and_put_record() {
        let (mut store, doc) = store_with_document();
        let sid = store.create(doc).unwrap();
        assert_eq!(store.get(sid).unwrap().as_deref(), Some(""));

        store.put(sid, "{\"title\":\"x\"}").unwrap();
        assert_eq!(store.get(sid).unwrap().as_deref(), Some("{\"title\":\"x\"}"));
        assert_eq!(store.document_of(sid).unwrap(), Some(doc));
        assert_eq!(store.records_for(doc).unwrap(), vec![sid]);
    }

    #[test]
    fn put_unknown_sid_fails() {
        let (mut store, _) = store_with_document();
        let err = store.put(SectionId(77), "{}").unwrap_err();
        assert!(matches!(err, StorageError::RecordNotFound(SectionId(77))));
    }

    #[test]
    fn create_for_unknown_document_fails() {
        let mut store = SqliteStore::in_memory().unwrap();
        let err = store.create(DocumentId(5)).unwrap_err();
        assert!(matches!(err, StorageError::DocumentNotFound(DocumentId(5))));
    }

    #[test]
    fn deleted_record_reads_as_absent() {
        let (mut store, doc) = store_with_document();
        let sid = store.create(doc).unwrap();
        assert!(store.delete(sid).unwrap());
        assert_eq!(store.get(sid).unwrap(), None);
        assert_eq!(store.document_of(sid).unwrap(), None);
        assert!(!store.delete(sid).unwrap());
    }

    #[test]
    fn globals_upsert() {
        let (mut store, _) = store_with_document();
        store.put_global("master_text_1", "{}").unwrap();
        store.put_global("master_text_1", "{\"a\":1}").unwrap();
        store.put_global("master_banner_2", "{}").unwrap();
        assert_eq!(
            store.get_global("master_text_1").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        assert_eq!(
            store.global_keys().unwrap(),
            vec!["master_banner_2".to_string(), "master_text_1".to_string()]
        );
        assert_eq!(store.get_global("missing").unwrap(), None);
    }

    #[test]
    fn layout_roundtrip_and_replace() {
        let (mut store, doc) = store_with_document();
        assert_eq!(store.get_layout(doc).unwrap(), None);
        store.put_layout(doc, &[SectionId(3), SectionId(1)]).unwrap();
        assert_eq!(
            store.get_layout(doc).unwrap(),
            Some(vec![SectionId(3), SectionId(1)])
        );
        store.put_layout(doc, &[]).unwrap();
        assert_eq!(store.get_layout(doc).unwrap(), Some(vec![]));
    }

    #[test]
    fn malformed_layout_is_an_integrity_error() {
        let (mut store, doc) = store_with_document();
        store.put_layout(doc, &[SectionId(1)]).unwrap();
        store
            .conn
            .execute(
                "UPDATE layouts SET sids_json = '[\"1\", true]' WHERE document_id = ?1",
                params![doc.0],
            )
            .unwrap();
        assert!(matches!(
            store.get_layout(doc),
            Err(StorageError::IntegrityError { .. })
        ));
    }

    #[test]
    fn layout_requires_document() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert!(matches!(
            store.put_layout(DocumentId(9), &[]),
            Err(StorageError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn revision_detection() {
        let (mut store, doc) = store_with_document();
        let rev = store.create_revision(doc).unwrap();
        assert!(!store.is_snapshot(doc).unwrap());
        assert!(store.is_snapshot(rev).unwrap());
        assert!(matches!(
            store.is_snapshot(DocumentId(1000)),
            Err(StorageError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn meta_prefix_is_literal() {
        let (mut store, doc) = store_with_document();
        store.add_meta(doc, "_old_1", "a").unwrap();
        store.add_meta(doc, "_oldX1", "b").unwrap();
        store.add_meta(doc, "_old-ids", "c").unwrap();

        // '_' would match any character under LIKE.
        assert_eq!(store.delete_meta_prefixed(doc, "_old_").unwrap(), 1);
        assert_eq!(store.delete_meta(doc, "_old-ids").unwrap(), 1);
        assert_eq!(store.meta_keys(doc).unwrap(), vec!["_oldX1".to_string()]);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.db");
        let (doc, sid) = {
            let mut store = SqliteStore::new(&path).unwrap();
            let doc = store.create_document().unwrap();
            let sid = store.create(doc).unwrap();
            store.put(sid, "{\"a\":true}").unwrap();
            store.put_layout(doc, &[sid]).unwrap();
            (doc, sid)
        };

        let store = SqliteStore::new(&path).unwrap();
        assert_eq!(store.get_layout(doc).unwrap(), Some(vec![sid]));
        assert_eq!(store.get(sid).unwrap().as_deref(), Some("{\"a\":true}"));
    }
}
