//! Content hashing over model fields.
//!
//! The hash identifies a record by what it says, not when it was written:
//! the stored hash itself and the audit timestamps are excluded, as are
//! fields with nothing in them. Field order comes from the model's field
//! view, so two snapshots of the same model hash identically.

use sha2::{Digest, Sha256};

use super::FieldMap;
use crate::naming::names_match;

/// Fields that never feed the content hash.
pub const EXCLUDED_FIELDS: [&str; 4] = ["hash", "dateAdded", "dateTimeAdded", "lastUpdated"];

/// Lowercase hex sha-256 over the hashable fields.
pub fn content_hash(fields: &FieldMap) -> String {
    let mut hasher = Sha256::new();

    for (field, value) in fields.iter() {
        if value.is_null() || EXCLUDED_FIELDS.iter().any(|e| names_match(e, field)) {
            continue;
        }
        hasher.update(field.as_bytes());
        hasher.update(b"=");
        hasher.update(value.to_string().as_bytes());
        hasher.update(b";");
    }

    hex::encode(hasher.finalize())
}
