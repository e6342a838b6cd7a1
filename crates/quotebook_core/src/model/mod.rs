//! Catalog domain model.
//!
//! # Responsibility
//! - Define the read models returned by the stores.
//! - Define the write-side drafts accepted by `create`/`update`.
//!
//! # Invariants
//! - Ids are assigned by storage; drafts never carry one.
//! - Timestamps are stamped by storage; drafts never carry them.

pub mod author;
pub mod book;
pub mod category;
pub mod quote;

use chrono::{DateTime, Utc};

/// Current wall-clock instant truncated to the millisecond precision used
/// by storage.
pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Converts a stored epoch-millisecond value back to a UTC instant.
pub(crate) fn millis_to_datetime(value: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(value)
}
