use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use sha2::{Digest, Sha256};

use crate::errors::{ErrorInfo, ShelfError};

/// Serialises `value` to compact JSON with object keys in sorted order.
pub fn to_canonical_json_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, ShelfError> {
    let value = serde_json::to_value(value)
        .map_err(|err| ShelfError::Io(ErrorInfo::new("json-encode", err.to_string())))?;
    serde_json::to_vec(&value)
        .map_err(|err| ShelfError::Io(ErrorInfo::new("json-encode", err.to_string())))
}

/// Computes a stable hexadecimal hash for the provided serializable payload.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, ShelfError> {
    let bytes = to_canonical_json_bytes(value)?;
    let digest = Sha256::digest(bytes);
    Ok(format!("{:x}", digest))
}

/// Renders `value` as pretty JSON with four-space indentation and a trailing
/// newline, the on-disk format of every JSON file shelfplan writes.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<Vec<u8>, ShelfError> {
    let mut out = Vec::new();
    let mut serializer =
        serde_json::Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    value
        .serialize(&mut serializer)
        .map_err(|err| ShelfError::Io(ErrorInfo::new("json-serialize", err.to_string())))?;
    out.push(b'\n');
    Ok(out)
}
