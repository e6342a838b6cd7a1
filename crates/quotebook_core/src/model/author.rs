//! Author domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Storage-assigned author identifier.
pub type AuthorId = i64;

/// Persisted author row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    /// Unique across authors, compared case-insensitively.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Write-side input for author create/update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AuthorDraft {
    pub name: String,
}

impl AuthorDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}
