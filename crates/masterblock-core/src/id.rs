//! Stable identity newtypes for documents, sections and master blocks.
//!
//! A [`SectionId`] is issued by the record store the first time a section is
//! saved and never changes afterwards. On the wire it is a decimal string
//! (`"5"`), which is how layouts and section records store it.

use std::fmt;
use std::str::FromStr;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Identity of a section record within the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionId(pub i64);

/// Identity of a document owning a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(pub i64);

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SectionId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CoreError::InvalidSid {
                value: s.to_string(),
            });
        }
        s.parse::<i64>()
            .map(SectionId)
            .map_err(|_| CoreError::InvalidSid {
                value: s.to_string(),
            })
    }
}

impl Serialize for SectionId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SectionId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SidVisitor;

        impl Visitor<'_> for SidVisitor {
            type Value = SectionId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a decimal string or a non-negative integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<SectionId, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<SectionId, E> {
                i64::try_from(v)
                    .map(SectionId)
                    .map_err(|_| E::custom(format!("sid out of range: {v}")))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<SectionId, E> {
                if v < 0 {
                    return Err(E::custom(format!("negative sid: {v}")));
                }
                Ok(SectionId(v))
            }
        }

        deserializer.deserialize_any(SidVisitor)
    }
}

/// Global-store key under which a master block lives.
///
/// Derived keys have the form `master_{section-type}_{sid}`. Because a sid is
/// all digits, splitting at the last underscore recovers both parts, so two
/// different `(section-type, sid)` pairs never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MasterKey(String);

impl MasterKey {
    const PREFIX: &'static str = "master_";

    /// Derives the key owned by section `sid` of type `section_type`.
    pub fn derive(section_type: &str, sid: SectionId) -> Result<Self, CoreError> {
        if section_type.is_empty() {
            return Err(CoreError::MissingSectionType);
        }
        Ok(MasterKey(format!("{}{}_{}", Self::PREFIX, section_type, sid)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MasterKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
