//! Core error types for masterblock-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of the section model: malformed identities, missing type
//! tags, and blobs that do not decode into a field map.

use thiserror::Error;

/// Core errors produced by the masterblock-core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A section carried no usable `section-type` tag.
    #[error("section has no section-type")]
    MissingSectionType,

    /// A `sid` value was neither empty, a decimal string, nor an integer.
    #[error("invalid sid: {value}")]
    InvalidSid { value: String },

    /// A reserved key held a value of the wrong shape.
    #[error("invalid value for '{key}': {reason}")]
    InvalidField { key: String, reason: String },

    /// A stored blob could not be decoded into a field map.
    #[error("decode failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// A field map could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The catalog document could not be parsed.
    #[error("catalog error: {0}")]
    Catalog(#[source] serde_json::Error),
}
