//! Acta identifiers.
//!
//! Identifiers are opaque strings. Freshly generated ones are random
//! 128-bit UUIDs rendered in their hyphenated form, which is what the
//! existing ledger already holds for seeded tally sheets.

use uuid::Uuid;

use crate::error::TypeError;

/// Generate a fresh random identifier.
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}

/// Reject identifiers that cannot serve as ledger keys.
///
/// Ids must be non-empty (the empty key is the open bound of a range
/// scan) and free of control characters.
pub fn validate(id: &str) -> Result<(), TypeError> {
    if id.is_empty() || id.chars().any(char::is_control) {
        return Err(TypeError::InvalidId(id.to_string()));
    }
    Ok(())
}
