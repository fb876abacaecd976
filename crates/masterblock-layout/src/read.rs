//! The read path: rebuild an ordered, merged section list from a layout.

use serde_json::Value;
use tracing::{debug, info, warn};

use masterblock_core::codec::decode_record;
use masterblock_core::section::{
    merge_missing, MASTER_REFERENCE_KEY, SECTION_TYPE_KEY, SID_KEY,
};
use masterblock_core::{DocumentId, FieldMap, Section, SectionCatalog, SectionId};
use masterblock_storage::LayoutBackend;

use crate::error::LayoutError;
use crate::report::{Gap, GapKind, LayoutRead};
use crate::service::SectionInstances;

impl<B: LayoutBackend, C: SectionCatalog> SectionInstances<B, C> {
    /// Reads the document's layout with each section merged over its master.
    ///
    /// Returns `Ok(None)` when no layout was ever saved. Entries that cannot
    /// be rebuilt are skipped and listed in [`LayoutRead::gaps`]; only store
    /// failures abort the read.
    pub fn read(&self, document: DocumentId) -> Result<Option<LayoutRead>, LayoutError> {
        let Some(layout) = self
            .backend
            .get_layout(document)
            .map_err(LayoutError::StoreReadFailed)?
        else {
            debug!(%document, "no layout saved");
            return Ok(None);
        };

        let mut read = LayoutRead {
            sections: Vec::with_capacity(layout.len()),
            gaps: Vec::new(),
        };
        for sid in layout {
            match self.load_section(sid)? {
                Ok(section) => read.sections.push(section),
                Err(kind) => {
                    let gap = Gap { sid, kind };
                    warn!(%document, "{}", gap);
                    read.gaps.push(gap);
                }
            }
        }

        info!(
            %document,
            sections = read.sections.len(),
            gaps = read.gaps.len(),
            "layout read"
        );
        Ok(Some(read))
    }

    /// Loads and merges one entry; the inner error is an integrity gap.
    fn load_section(&self, sid: SectionId) -> Result<Result<Section, GapKind>, LayoutError> {
        let Some(blob) = self
            .backend
            .get(sid)
            .map_err(LayoutError::StoreReadFailed)?
        else {
            return Ok(Err(GapKind::MissingRecord));
        };
        let mut record = match decode_record(&blob) {
            Ok(record) => record,
            Err(e) => {
                return Ok(Err(GapKind::UndecodableRecord {
                    reason: e.to_string(),
                }))
            }
        };

        match record.get(SID_KEY) {
            Some(Value::String(s)) if s.parse::<SectionId>().ok() == Some(sid) => {}
            Some(other) => {
                let found = other.as_str().map(str::to_string).unwrap_or_else(|| other.to_string());
                return Ok(Err(GapKind::SidMismatch { found }));
            }
            None => return Ok(Err(GapKind::SidMismatch { found: String::new() })),
        }

        if let Some(key) = self.live_reference(&record) {
            let Some(master_blob) = self
                .backend
                .get_global(&key)
                .map_err(LayoutError::StoreReadFailed)?
            else {
                return Ok(Err(GapKind::MissingMaster { key }));
            };
            match decode_record(&master_blob) {
                Ok(master) => merge_missing(&mut record, master),
                Err(e) => {
                    return Ok(Err(GapKind::UndecodableMaster {
                        key,
                        reason: e.to_string(),
                    }))
                }
            }
        }

        Ok(Section::from_record(record).map_err(|e| GapKind::IncompleteRecord {
            reason: e.to_string(),
        }))
    }

    /// The master key to merge from, if the record points at one.
    ///
    /// A reference equal to the type's inert default points nowhere.
    fn live_reference(&self, record: &FieldMap) -> Option<String> {
        let reference = record.get(MASTER_REFERENCE_KEY)?.as_str()?;
        if reference.is_empty() {
            return None;
        }
        if let Some(section_type) = record.get(SECTION_TYPE_KEY).and_then(Value::as_str) {
            if self.catalog.default_master_reference(section_type) == reference {
                return None;
            }
        }
        Some(reference.to_string())
    }
}
