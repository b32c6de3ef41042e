//! SHA-256 content hashing.

use sha2::{Digest, Sha256};

/// Separator used when hashing a list of context parts.
pub const PART_SEPARATOR: &str = "\n\n";

/// Lowercase hex SHA-256 of raw bytes.
pub fn hash_bytes(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    format!("{:x}", hasher.finalize())
}

pub fn hash_str(input: &str) -> String {
    hash_bytes(input.as_bytes())
}

/// Hash parts joined with a blank line, the same text the translator receives as context.
pub fn hash_parts<S: AsRef<str>>(parts: &[S]) -> String {
    let joined = parts
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(PART_SEPARATOR);
    hash_str(&joined)
}
