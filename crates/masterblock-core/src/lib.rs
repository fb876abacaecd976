pub mod catalog;
pub mod codec;
pub mod error;
pub mod id;
pub mod section;

// Re-export commonly used types
pub use catalog::{SectionCatalog, SectionDefaults, SettingsRequest, StaticCatalog};
pub use error::CoreError;
pub use id::{DocumentId, MasterKey, SectionId};
pub use section::{FieldMap, Section, IDENTITY_KEYS};
