//! Content fingerprints for saved bodies.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 of a serializable value, as 64 lowercase hex characters.
///
/// The value is serialized to JSON first, so equal bodies always produce
/// equal fingerprints.
pub fn fingerprint<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}
