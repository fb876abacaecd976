//! Outcome types for compose and read.

use std::fmt;

use serde::Serialize;

use masterblock_core::{MasterKey, Section, SectionId};

/// Result of a compose call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Composition {
    /// The document is a revision snapshot; nothing was written.
    Skipped,
    /// The layout and its records were written.
    Saved(SaveReport),
}

impl Composition {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Composition::Skipped)
    }

    pub fn report(&self) -> Option<&SaveReport> {
        match self {
            Composition::Skipped => None,
            Composition::Saved(report) => Some(report),
        }
    }

    pub fn into_report(self) -> Option<SaveReport> {
        match self {
            Composition::Skipped => None,
            Composition::Saved(report) => Some(report),
        }
    }
}

/// What a successful compose wrote, and what it left behind.
///
/// Orphans (`released_references`, `dropped`) are reported, never deleted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SaveReport {
    /// The persisted sid order.
    pub layout: Vec<SectionId>,
    /// Sections as saved: sids assigned and references set or reset.
    pub sections: Vec<Section>,
    /// Sids issued during this save.
    pub allocated: Vec<SectionId>,
    /// Master blocks written during this save.
    pub masters_created: Vec<MasterKey>,
    /// References cleared because their section was un-mastered.
    pub released_references: Vec<ReleasedReference>,
    /// Sids of the previous layout that the new one no longer lists.
    pub dropped: Vec<SectionId>,
    /// Legacy document-meta entries removed before writing.
    pub legacy_keys_purged: usize,
}

/// A master reference dropped when its section stopped being a master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReleasedReference {
    pub sid: SectionId,
    pub key: String,
}

/// A read layout: every section that could be rebuilt, plus what could not.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LayoutRead {
    pub sections: Vec<Section>,
    pub gaps: Vec<Gap>,
}

impl LayoutRead {
    /// True when every sid in the layout was rebuilt.
    pub fn is_complete(&self) -> bool {
        self.gaps.is_empty()
    }

    pub fn gap_sids(&self) -> Vec<SectionId> {
        self.gaps.iter().map(|g| g.sid).collect()
    }
}

/// A layout entry that was skipped while reading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Gap {
    pub sid: SectionId,
    #[serde(flatten)]
    pub kind: GapKind,
}

/// Why a layout entry was skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GapKind {
    /// The layout lists a sid with no backing record.
    MissingRecord,
    /// The record blob is not a JSON object.
    UndecodableRecord { reason: String },
    /// The record's sid field disagrees with the layout entry.
    SidMismatch { found: String },
    /// The record references a master block that does not exist.
    MissingMaster { key: String },
    /// The master blob is not a JSON object.
    UndecodableMaster { key: String, reason: String },
    /// The merged record does not form a valid section.
    IncompleteRecord { reason: String },
}

impl fmt::Display for GapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapKind::MissingRecord => write!(f, "missing record"),
            GapKind::UndecodableRecord { reason } => write!(f, "undecodable record: {reason}"),
            GapKind::SidMismatch { found } => write!(f, "record carries sid '{found}'"),
            GapKind::MissingMaster { key } => write!(f, "missing master block '{key}'"),
            GapKind::UndecodableMaster { key, reason } => {
                write!(f, "undecodable master block '{key}': {reason}")
            }
            GapKind::IncompleteRecord { reason } => write!(f, "incomplete record: {reason}"),
        }
    }
}

impl fmt::Display for Gap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "section {}: {}", self.sid, self.kind)
    }
}
