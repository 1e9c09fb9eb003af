//! Pack integrity: SHA-256 over the compact, key-sorted JSON of the payload
//! with its own `checksum` field removed.

use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::PackError;

pub const CHECKSUM_FIELD: &str = "checksum";

/// Lowercase hex SHA-256 of the canonical payload bytes.
pub fn canonical_checksum(payload: &Value) -> Result<String, PackError> {
    let mut stripped = payload.clone();
    if let Some(map) = stripped.as_object_mut() {
        map.remove(CHECKSUM_FIELD);
    }
    // serde_json::Map is a BTreeMap here, so keys serialize sorted.
    let bytes = serde_json::to_vec(&stripped)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Check the declared checksum against the computed one; returns the checksum.
pub fn verify_checksum(payload: &Value) -> Result<String, PackError> {
    let declared = payload
        .get(CHECKSUM_FIELD)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or(PackError::MissingChecksum)?;
    let computed = canonical_checksum(payload)?;
    if !declared.eq_ignore_ascii_case(&computed) {
        return Err(PackError::ChecksumMismatch {
            declared: declared.to_string(),
            computed,
        });
    }
    Ok(computed)
}

/// Stamp `payload` with its canonical checksum, replacing any previous value.
pub fn stamp_checksum(payload: &mut Value) -> Result<String, PackError> {
    let checksum = canonical_checksum(payload)?;
    if let Some(map) = payload.as_object_mut() {
        map.insert(CHECKSUM_FIELD.into(), Value::String(checksum.clone()));
    }
    Ok(checksum)
}
