//! UUID v7 utilities for time-ordered identifiers.

use uuid::Uuid;

/// Generate a new UUIDv7 identifier.
///
/// UUIDv7 embeds a Unix timestamp (milliseconds) in the first 48 bits,
/// providing natural time-ordering for change-set primary keys.
#[inline]
pub fn new_v7() -> Uuid {
    Uuid::now_v7()
}
