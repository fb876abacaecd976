//! Layered section storage for document layouts.
//!
//! [`SectionInstances`] is the service object callers construct once and
//! keep around. It owns a storage backend and a section-type catalog and
//! offers the two halves of the layout lifecycle:
//!
//! - **Compose** ([`SectionInstances::compose`]): assign stable sids, move
//!   the content of newly mastered sections into the global store, reset
//!   references on un-mastered ones, persist each record, and replace the
//!   document's layout.
//! - **Read** ([`SectionInstances::read`]): walk the layout, load each
//!   record, fill gaps from its master block, and report anything that could
//!   not be reconstructed instead of aborting.
//!
//! # Modules
//!
//! - [`error`]: LayoutError enum
//! - [`report`]: save and read outcome types
//! - [`service`]: the SectionInstances service
//! - `compose` / `read`: the write and read paths

mod compose;
pub mod error;
mod read;
pub mod report;
pub mod service;

pub use error::LayoutError;
pub use report::{Composition, Gap, GapKind, LayoutRead, ReleasedReference, SaveReport};
pub use service::{LegacyKeys, SectionInstances};
