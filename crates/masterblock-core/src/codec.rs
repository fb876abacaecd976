//! Blob encoding for section records and master blocks.
//!
//! Blobs are compact JSON objects. Key order is preserved in both directions,
//! so `encode(decode(x)) == x` for any blob this module produced.

use crate::error::CoreError;
use crate::section::FieldMap;

/// Encodes a field map as a compact JSON object.
pub fn encode_record(record: &FieldMap) -> Result<String, CoreError> {
    serde_json::to_string(record).map_err(CoreError::Encode)
}

/// Decodes a blob that must hold a JSON object.
pub fn decode_record(blob: &str) -> Result<FieldMap, CoreError> {
    serde_json::from_str(blob).map_err(CoreError::Decode)
}
