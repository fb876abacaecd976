//! The write path: turn an ordered section list into records and a layout.
//!
//! Runs in two phases so that identity problems abort before anything is
//! written:
//!
//! 1. Validate the input (every section typed; sids known, owned by this
//!    document, not repeated), then allocate sids for new sections.
//! 2. Purge legacy meta, then for each section in order: extract or clear
//!    its master, write its record, and finally replace the layout.

use std::collections::HashSet;

use tracing::{debug, info};

use masterblock_core::codec::encode_record;
use masterblock_core::section::split_identity;
use masterblock_core::{
    CoreError, DocumentId, FieldMap, MasterKey, Section, SectionCatalog, SectionDefaults,
    SectionId,
};
use masterblock_storage::LayoutBackend;

use crate::error::LayoutError;
use crate::report::{Composition, ReleasedReference, SaveReport};
use crate::service::SectionInstances;

impl<B: LayoutBackend, C: SectionCatalog> SectionInstances<B, C> {
    /// Normalizes raw builder maps and composes them.
    pub fn compose_raw(
        &mut self,
        document: DocumentId,
        raw: Vec<FieldMap>,
    ) -> Result<Composition, LayoutError> {
        let sections = raw
            .into_iter()
            .map(Section::from_raw)
            .collect::<Result<Vec<_>, _>>()?;
        self.compose(document, sections)
    }

    /// Fills type defaults into the sections that carry their own content.
    ///
    /// Sections with a live master reference are skipped, so on read the
    /// master still fills their missing fields.
    pub fn apply_defaults(&self, sections: &mut [Section], defaults: &SectionDefaults) {
        for section in sections.iter_mut() {
            if !self.references_master(section) {
                section.apply_defaults(defaults);
            }
        }
    }

    /// True when the section points at a master block. The type's inert
    /// reference points nowhere.
    fn references_master(&self, section: &Section) -> bool {
        section.has_master_reference()
            && section.master_reference
                != self.catalog.default_master_reference(&section.section_type)
    }

    /// Persists `sections` as the document's layout.
    ///
    /// Does nothing for revision snapshots. Records dropped from the layout
    /// and master blocks released by un-mastering stay in storage and are
    /// listed in the report.
    pub fn compose(
        &mut self,
        document: DocumentId,
        sections: Vec<Section>,
    ) -> Result<Composition, LayoutError> {
        if self
            .backend
            .is_snapshot(document)
            .map_err(LayoutError::StoreReadFailed)?
        {
            debug!(%document, "skipping compose for revision snapshot");
            return Ok(Composition::Skipped);
        }

        let previous = self
            .backend
            .get_layout(document)
            .map_err(LayoutError::StoreReadFailed)?
            .unwrap_or_default();

        self.validate_identities(document, &sections)?;

        let mut report = SaveReport::default();
        let mut sections = sections;
        let mut layout = Vec::with_capacity(sections.len());
        for section in &mut sections {
            let sid = match section.sid {
                Some(sid) => sid,
                None => {
                    let sid = self.backend.create(document).map_err(|source| {
                        LayoutError::IdentityAllocationFailed { document, source }
                    })?;
                    debug!(%document, %sid, section_type = %section.section_type, "allocated section id");
                    section.sid = Some(sid);
                    report.allocated.push(sid);
                    sid
                }
            };
            layout.push(sid);
        }

        report.legacy_keys_purged = self.purge_legacy(document)?;

        for (section, &sid) in sections.iter_mut().zip(&layout) {
            let record = self.prepare_record(sid, section, &mut report)?;
            let blob = encode_record(&record)?;
            self.backend
                .put(sid, &blob)
                .map_err(LayoutError::StoreWriteFailed)?;
        }

        self.backend
            .put_layout(document, &layout)
            .map_err(LayoutError::StoreWriteFailed)?;

        let kept: HashSet<SectionId> = layout.iter().copied().collect();
        report.dropped = previous
            .into_iter()
            .filter(|sid| !kept.contains(sid))
            .collect();

        info!(
            %document,
            sections = layout.len(),
            allocated = report.allocated.len(),
            masters = report.masters_created.len(),
            dropped = report.dropped.len(),
            "layout saved"
        );

        report.layout = layout;
        report.sections = sections;
        Ok(Composition::Saved(report))
    }

    fn validate_identities(
        &self,
        document: DocumentId,
        sections: &[Section],
    ) -> Result<(), LayoutError> {
        if sections.iter().any(|s| s.section_type.is_empty()) {
            return Err(CoreError::MissingSectionType.into());
        }
        let mut seen = HashSet::new();
        for sid in sections.iter().filter_map(|s| s.sid) {
            if !seen.insert(sid) {
                return Err(LayoutError::DuplicateSection { sid });
            }
            match self
                .backend
                .document_of(sid)
                .map_err(LayoutError::StoreReadFailed)?
            {
                None => return Err(LayoutError::UnknownSection { sid }),
                Some(owner) if owner != document => {
                    return Err(LayoutError::ForeignSection {
                        sid,
                        owner,
                        document,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn purge_legacy(&mut self, document: DocumentId) -> Result<usize, LayoutError> {
        if self.legacy.is_empty() {
            return Ok(0);
        }
        let mut purged = 0;
        for key in &self.legacy.exact {
            purged += self
                .backend
                .delete_meta(document, key)
                .map_err(LayoutError::StoreWriteFailed)?;
        }
        for prefix in &self.legacy.prefixes {
            purged += self
                .backend
                .delete_meta_prefixed(document, prefix)
                .map_err(LayoutError::StoreWriteFailed)?;
        }
        if purged > 0 {
            debug!(%document, purged, "removed legacy meta");
        }
        Ok(purged)
    }

    /// Applies the master rules to one section and returns the record to store.
    ///
    /// A master without a live reference has its content written to the
    /// global store and is reduced to its identity keys. A non-master gets
    /// the type's inert reference. A master with a live reference keeps it.
    /// The inert reference counts as no reference at all.
    fn prepare_record(
        &mut self,
        sid: SectionId,
        section: &mut Section,
        report: &mut SaveReport,
    ) -> Result<FieldMap, LayoutError> {
        let live = self.references_master(section);

        if section.is_master && !live {
            let key = MasterKey::derive(&section.section_type, sid)?;
            section.master_reference = key.to_string();

            let (identity, master) = split_identity(section.clone().into_record());
            let blob = encode_record(&master)?;
            self.backend
                .put_global(key.as_str(), &blob)
                .map_err(LayoutError::StoreWriteFailed)?;
            debug!(%sid, key = %key, "extracted master block");

            report.masters_created.push(key);
            return Ok(identity);
        }

        if !section.is_master {
            if live {
                debug!(%sid, key = %section.master_reference, "released master reference");
                report.released_references.push(ReleasedReference {
                    sid,
                    key: std::mem::take(&mut section.master_reference),
                });
            }
            section.master_reference = self.catalog.default_master_reference(&section.section_type);
        }

        Ok(section.clone().into_record())
    }
}
