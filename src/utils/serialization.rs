// src/utils/serialization.rs
//! JSON helpers for exporting and restoring the audit log.

use serde::{Deserialize, Serialize};

/// Compact JSON encoding of `data`.
pub fn serialize<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Decodes JSON produced by [`serialize`]. Unknown shapes are an error,
/// never a default value.
pub fn deserialize<'a, T: Deserialize<'a>>(data: &'a str) -> Result<T, serde_json::Error> {
    serde_json::from_str(data)
}
