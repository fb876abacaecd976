//! Section-type catalog: default field sets, builder controls, and the
//! inert `master-reference` default for each type.
//!
//! The catalog itself is external metadata. This module only knows the
//! shape needed by the layout service and the settings lookup, and makes
//! sure every type's defaults carry the two identity fields.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::section::{FieldMap, IS_MASTER_KEY, MASTER_REFERENCE_KEY};

/// Default field set per section type.
pub type SectionDefaults = IndexMap<String, FieldMap>;

/// Lookup of the inert `master-reference` value for a section type.
pub trait SectionCatalog {
    /// Value a non-master section of `section_type` carries as its reference.
    fn default_master_reference(&self, section_type: &str) -> String;
}

/// One builder control in a section type's settings panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlDef {
    #[serde(rename = "type")]
    pub kind: String,
    pub label: String,
    pub name: String,
    #[serde(default)]
    pub default: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Catalog entry for one section type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectionTypeDef {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub config: Vec<ControlDef>,
    #[serde(default)]
    pub defaults: FieldMap,
}

/// Explicit parameters of a settings-panel request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsRequest {
    #[serde(rename = "type", default)]
    pub section_type: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

/// Inserts `is-master = false` and `master-reference = ""` into every
/// type's default set, overwriting whatever the type declared.
pub fn add_identity_defaults(defaults: &mut SectionDefaults) {
    for type_defaults in defaults.values_mut() {
        type_defaults.insert(IS_MASTER_KEY.to_string(), Value::Bool(false));
        type_defaults.insert(MASTER_REFERENCE_KEY.to_string(), Value::String(String::new()));
    }
}

/// Appends the "Master" checkbox and "Master ID" text controls.
pub fn add_identity_controls(config: &mut Vec<ControlDef>) {
    config.retain(|c| c.name != IS_MASTER_KEY && c.name != MASTER_REFERENCE_KEY);
    config.push(ControlDef {
        kind: "checkbox".to_string(),
        label: "Master".to_string(),
        name: IS_MASTER_KEY.to_string(),
        default: Value::Bool(false),
        description: None,
    });
    config.push(ControlDef {
        kind: "text".to_string(),
        label: "Master ID".to_string(),
        name: MASTER_REFERENCE_KEY.to_string(),
        default: Value::String(String::new()),
        description: None,
    });
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    sections: IndexMap<String, SectionTypeDef>,
}

/// In-process catalog built from a fixed set of section types.
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    types: IndexMap<String, SectionTypeDef>,
    /// `master-reference` strings declared by types before identity defaulting.
    inert: IndexMap<String, String>,
}

impl StaticCatalog {
    /// Builds a catalog, adding identity defaults and controls to every type.
    ///
    /// A string `master-reference` a type declares becomes its inert
    /// reference; its default set still gets the empty one.
    pub fn new(types: IndexMap<String, SectionTypeDef>) -> Self {
        let inert = types
            .iter()
            .filter_map(|(name, def)| match def.defaults.get(MASTER_REFERENCE_KEY) {
                Some(Value::String(s)) if !s.is_empty() => Some((name.clone(), s.clone())),
                _ => None,
            })
            .collect();
        let mut defaults: SectionDefaults = types
            .iter()
            .map(|(name, def)| (name.clone(), def.defaults.clone()))
            .collect();
        add_identity_defaults(&mut defaults);

        let types = types
            .into_iter()
            .map(|(name, mut def)| {
                if let Some(d) = defaults.shift_remove(&name) {
                    def.defaults = d;
                }
                add_identity_controls(&mut def.config);
                (name, def)
            })
            .collect();
        StaticCatalog { types, inert }
    }

    /// Parses a catalog document: `{"sections": {"<type>": {label, config, defaults}}}`.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        let file: CatalogFile = serde_json::from_str(json).map_err(CoreError::Catalog)?;
        Ok(Self::new(file.sections))
    }

    pub fn get(&self, section_type: &str) -> Option<&SectionTypeDef> {
        self.types.get(section_type)
    }

    pub fn section_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Default field sets of every type, identity fields included.
    pub fn defaults(&self) -> SectionDefaults {
        self.types
            .iter()
            .map(|(name, def)| (name.clone(), def.defaults.clone()))
            .collect()
    }

    /// Controls for the requested section type; empty when unknown.
    pub fn settings(&self, request: &SettingsRequest) -> Vec<ControlDef> {
        request
            .section_type
            .as_deref()
            .and_then(|t| self.types.get(t))
            .map(|def| def.config.clone())
            .unwrap_or_default()
    }
}

impl SectionCatalog for StaticCatalog {
    fn default_master_reference(&self, section_type: &str) -> String {
        self.inert.get(section_type).cloned().unwrap_or_default()
    }
}
