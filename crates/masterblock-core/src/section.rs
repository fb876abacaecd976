//! The [`Section`] wrapper and its flat record form.
//!
//! In storage a section is a flat, string-keyed [`FieldMap`]. In memory the
//! identity-relevant keys are lifted into typed fields and everything else
//! stays in an opaque, type-erased map owned by the section type's schema.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::catalog::SectionDefaults;
use crate::error::CoreError;
use crate::id::SectionId;

/// Ordered mapping of field name to dynamic value.
pub type FieldMap = IndexMap<String, Value>;

pub const SID_KEY: &str = "sid";
pub const SECTION_TYPE_KEY: &str = "section-type";
pub const IS_MASTER_KEY: &str = "is-master";
pub const MASTER_REFERENCE_KEY: &str = "master-reference";

/// Keys that stay on an instance record when its content moves into a master block.
pub const IDENTITY_KEYS: [&str; 3] = [SID_KEY, IS_MASTER_KEY, MASTER_REFERENCE_KEY];

/// Returns true if `key` is one of [`IDENTITY_KEYS`].
pub fn is_identity_key(key: &str) -> bool {
    IDENTITY_KEYS.contains(&key)
}

/// A single layout section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Record-store identity; `None` until the first save.
    pub sid: Option<SectionId>,
    /// Schema/renderer tag, opaque to this crate.
    pub section_type: String,
    pub is_master: bool,
    /// Empty, the type's inert default, or a global-store key.
    pub master_reference: String,
    /// Every other field, in insertion order.
    pub fields: FieldMap,
}

impl Section {
    /// Creates an unsaved, non-master section of the given type.
    pub fn new(section_type: impl Into<String>) -> Self {
        Section {
            sid: None,
            section_type: section_type.into(),
            is_master: false,
            master_reference: String::new(),
            fields: FieldMap::new(),
        }
    }

    /// Builder-style field setter.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// True when `master_reference` points somewhere.
    pub fn has_master_reference(&self) -> bool {
        !self.master_reference.is_empty()
    }

    /// Normalizes a raw field map coming from the builder.
    ///
    /// Accepts the loose shapes a form submission produces: `sid` as digits,
    /// integer or empty string, and `is-master` as a checkbox value.
    pub fn from_raw(mut raw: FieldMap) -> Result<Self, CoreError> {
        let sid = match raw.shift_remove(SID_KEY) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.is_empty() => None,
            Some(value) => Some(parse_sid(&value)?),
        };

        let section_type = match raw.shift_remove(SECTION_TYPE_KEY) {
            Some(Value::String(s)) if !s.is_empty() => s,
            _ => return Err(CoreError::MissingSectionType),
        };

        let is_master = raw
            .shift_remove(IS_MASTER_KEY)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        let master_reference = match raw.shift_remove(MASTER_REFERENCE_KEY) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s,
            Some(other) => {
                return Err(CoreError::InvalidField {
                    key: MASTER_REFERENCE_KEY.to_string(),
                    reason: format!("expected a string, got {other}"),
                })
            }
        };

        Ok(Section {
            sid,
            section_type,
            is_master,
            master_reference,
            fields: raw,
        })
    }

    /// Rebuilds a section from a stored (and possibly merged) record.
    ///
    /// Unlike [`Section::from_raw`] this is strict: `is-master` must be a
    /// boolean when present and `section-type` must be present.
    pub fn from_record(record: FieldMap) -> Result<Self, CoreError> {
        if let Some(value) = record.get(IS_MASTER_KEY) {
            if !value.is_boolean() {
                return Err(CoreError::InvalidField {
                    key: IS_MASTER_KEY.to_string(),
                    reason: format!("expected a boolean, got {value}"),
                });
            }
        }
        Self::from_raw(record)
    }

    /// Flattens the section into its record form.
    ///
    /// Identity keys come first, then `section-type`, then the fields.
    pub fn into_record(self) -> FieldMap {
        let mut record = FieldMap::with_capacity(self.fields.len() + 4);
        record.insert(
            SID_KEY.to_string(),
            Value::String(self.sid.map(|s| s.to_string()).unwrap_or_default()),
        );
        record.insert(IS_MASTER_KEY.to_string(), Value::Bool(self.is_master));
        record.insert(
            MASTER_REFERENCE_KEY.to_string(),
            Value::String(self.master_reference),
        );
        record.insert(
            SECTION_TYPE_KEY.to_string(),
            Value::String(self.section_type),
        );
        for (key, value) in self.fields {
            if !record.contains_key(&key) {
                record.insert(key, value);
            }
        }
        record
    }

    /// Fills fields missing from this section with its type's defaults.
    ///
    /// Present fields are never overwritten, and identity keys in the
    /// default set are ignored since they live in typed fields.
    pub fn apply_defaults(&mut self, defaults: &SectionDefaults) {
        let Some(type_defaults) = defaults.get(&self.section_type) else {
            return;
        };
        for (key, value) in type_defaults {
            if is_identity_key(key) || key == SECTION_TYPE_KEY {
                continue;
            }
            if !self.fields.contains_key(key) {
                self.fields.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Splits a record into `(identity, rest)`; identity keeps [`IDENTITY_KEYS`].
pub fn split_identity(record: FieldMap) -> (FieldMap, FieldMap) {
    record
        .into_iter()
        .partition(|(key, _)| is_identity_key(key))
}

/// Adds every key of `master` that `instance` does not already define.
///
/// Instance values always win; the master only fills gaps.
pub fn merge_missing(instance: &mut FieldMap, master: FieldMap) {
    for (key, value) in master {
        instance.entry(key).or_insert(value);
    }
}

/// Checkbox-style truthiness used for `is-master`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64() == Some(1.0),
        Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn parse_sid(value: &Value) -> Result<SectionId, CoreError> {
    serde_json::from_value::<SectionId>(value.clone()).map_err(|_| CoreError::InvalidSid {
        value: value.to_string(),
    })
}
