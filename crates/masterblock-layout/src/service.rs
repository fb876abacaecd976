//! The [`SectionInstances`] service object.
//!
//! Constructed once at startup and handed to whatever needs to save or read
//! layouts. It carries no state beyond its backend, catalog and legacy-key
//! configuration, so there is nothing singleton about it.

use masterblock_core::SectionCatalog;
use masterblock_storage::LayoutBackend;

/// Legacy document-meta keys purged on every save.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegacyKeys {
    /// Keys removed by exact name.
    pub exact: Vec<String>,
    /// Keys removed by prefix.
    pub prefixes: Vec<String>,
}

impl LegacyKeys {
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty()
    }
}

/// Composes and reads document layouts on top of a storage backend.
pub struct SectionInstances<B, C> {
    pub(crate) backend: B,
    pub(crate) catalog: C,
    pub(crate) legacy: LegacyKeys,
}

impl<B: LayoutBackend, C: SectionCatalog> SectionInstances<B, C> {
    pub fn new(backend: B, catalog: C) -> Self {
        SectionInstances {
            backend,
            catalog,
            legacy: LegacyKeys::default(),
        }
    }

    /// Sets the legacy keys purged before each save.
    pub fn with_legacy_keys(mut self, legacy: LegacyKeys) -> Self {
        self.legacy = legacy;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}
